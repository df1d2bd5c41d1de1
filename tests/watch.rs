use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::thread;
use std::time::{Duration, Instant};

use fdmom::{AsWatch, Error, Membership, Timeout, Watch};

// Leeway for no delay expectations.
const HOLDUP_MAX: Duration = Duration::from_millis(100);

// Bounds indefinite awaits which should have returned long before.
const FAILSAFE_AFTER: Duration = Duration::from_secs(2);

/// Test subject with one pipe. The watch is closed on drop.
struct Pipe {
    watch: Option<Watch>,
    r: File,
    w: File,
    r_fd: RawFd,
    _failsafe: Option<File>,
}

impl Pipe {
    fn new() -> Self {
        let watch = Watch::open().expect("open watch");
        let (r, w) = nix::unistd::pipe().expect("pipe");
        let r = File::from(r);
        let r_fd = r.as_raw_fd();
        Self {
            watch: Some(watch),
            r,
            w: File::from(w),
            r_fd,
            _failsafe: None,
        }
    }

    /// Includes a descriptor which gets read ready after [`FAILSAFE_AFTER`],
    /// such that an indefinite await can not hang the test run.
    fn arm_failsafe(&mut self) -> RawFd {
        let (r, w) = nix::unistd::pipe().expect("failsafe pipe");
        let fd = r.as_raw_fd();
        self.watch().include_fd(fd).expect("failsafe inclusion");
        self._failsafe = Some(File::from(r));
        thread::spawn(move || {
            thread::sleep(FAILSAFE_AFTER);
            // fails once the test is done with the reader
            let _ = File::from(w).write_all(b"x");
        });
        fd
    }

    fn watch(&mut self) -> &mut Watch {
        self.watch.as_mut().expect("watch open")
    }

    fn await_fd(&mut self, timeout: impl Into<Timeout>) -> fdmom::Result<RawFd> {
        self.watch().await_fd_with_read(timeout.into())
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.close().expect("close watch");
        }
    }
}

// An empty watch list may not result in read ready.
#[test]
fn none_timeout() {
    let mut p = Pipe::new();

    let start = Instant::now();
    let got = p.await_fd(Duration::ZERO);
    assert!(matches!(got, Err(Error::Timeout)), "non-blocking got {got:?}, want timeout");
    let age = start.elapsed();
    assert!(age <= HOLDUP_MAX, "non-blocking took {age:?}, want {HOLDUP_MAX:?} at most");

    let block_for = Duration::from_millis(500);
    let start = Instant::now();
    let got = p.await_fd(block_for);
    assert!(matches!(got, Err(Error::Timeout)), "wait up to 500 ms got {got:?}, want timeout");
    let age = start.elapsed();
    assert!(
        age >= block_for && age <= block_for + HOLDUP_MAX,
        "wait up to 500 ms took {age:?}, want in range [{block_for:?}, {:?}]",
        block_for + HOLDUP_MAX
    );
}

// Sub-millisecond bounds round up instead of polling.
#[test]
fn fractional_timeout_rounds_up() {
    let mut p = Pipe::new();

    let block_for = Duration::from_micros(1_500);
    let start = Instant::now();
    let got = p.await_fd(block_for);
    assert!(matches!(got, Err(Error::Timeout)), "got {got:?}, want timeout");
    assert!(start.elapsed() >= block_for, "took {:?}, want {block_for:?} at least", start.elapsed());
}

// Timeout first and then find read ready.
#[test]
fn timeout_recover() {
    let mut p = Pipe::new();
    let fd = p.r_fd;
    p.watch().include_fd(fd).unwrap();

    let got = p.await_fd(Duration::from_millis(10));
    assert!(matches!(got, Err(Error::Timeout)), "initial await got {got:?}, want timeout");

    let write_delay = Duration::from_millis(1);
    let mut w = p.w.try_clone().unwrap();
    let writer = thread::spawn(move || {
        thread::sleep(write_delay);
        w.write_all(b"Hello").expect("test data lost");
    });

    let got = p.await_fd(write_delay + HOLDUP_MAX);
    assert_eq!(got.ok(), Some(fd), "second await, want fd {fd}");
    writer.join().unwrap();
}

#[test]
fn pending_write() {
    let mut p = Pipe::new();
    let fd = p.r_fd;

    // before inclusion on watch list
    p.w.write_all(b"Hello").unwrap();
    p.watch().include_fd(fd).unwrap();
    p.arm_failsafe();

    // should work on all timeout options, and repeatedly
    assert_eq!(p.await_fd(Timeout::ZERO).ok(), Some(fd), "non-blocking");
    assert_eq!(p.await_fd(Duration::from_millis(1)).ok(), Some(fd), "await 1 ms");
    assert_eq!(p.await_fd(Timeout::Indefinite).ok(), Some(fd), "indefinite wait");
    assert_eq!(p.await_fd(Timeout::from_millis(-1)).ok(), Some(fd), "negative wait");
}

#[test]
fn include_dupe() {
    let mut p = Pipe::new();
    let fd = p.r_fd;

    p.watch().include_fd(fd).expect("initial inclusion");
    p.watch().include_fd(fd).expect("redundant inclusion");

    p.w.write_all(b"Hello").unwrap();
    assert_eq!(p.await_fd(HOLDUP_MAX).ok(), Some(fd));

    // one event per ready descriptor, not one per inclusion
    let mut buf = [0; 5];
    p.r.read_exact(&mut buf).unwrap();
    let got = p.await_fd(Duration::from_millis(20));
    assert!(matches!(got, Err(Error::Timeout)), "after drain got {got:?}, want timeout");
}

#[test]
fn exclude_dupe() {
    let mut p = Pipe::new();
    let fd = p.r_fd;

    p.watch().include_fd(fd).unwrap();
    p.watch().exclude_fd(fd).expect("initial exclusion");
    p.watch().exclude_fd(fd).expect("redundant exclusion");

    p.w.write_all(b"Hello").unwrap();
    let got = p.await_fd(Duration::from_millis(50));
    assert!(matches!(got, Err(Error::Timeout)), "got {got:?}, want timeout");
}

#[test]
fn exclude_never_included() {
    let mut p = Pipe::new();
    let fd = p.r_fd;
    p.watch().exclude_fd(fd).expect("exclusion of a non-member");
}

// Exclusion applies to data which was pending already.
#[test]
fn exclude_pending() {
    let mut p = Pipe::new();
    let fd = p.r_fd;

    p.watch().include_fd(fd).unwrap();
    p.w.write_all(b"Hello").unwrap();
    assert_eq!(p.await_fd(Timeout::ZERO).ok(), Some(fd));

    p.watch().exclude_fd(fd).unwrap();
    let got = p.await_fd(Duration::from_millis(50));
    assert!(matches!(got, Err(Error::Timeout)), "got {got:?}, want timeout");
}

// Closing a member from the outside leaves the watch usable.
#[test]
fn member_closed_by_owner() {
    let mut watch = Watch::open().unwrap();
    let (r, w) = nix::unistd::pipe().unwrap();
    let fd = r.as_raw_fd();
    watch.include_fd(fd).unwrap();
    File::from(w).write_all(b"Hello").unwrap();
    drop(r);

    let got = watch.await_fd_with_read(Duration::from_millis(50).into());
    assert!(matches!(got, Err(Error::Timeout)), "got {got:?}, want timeout");
    watch.exclude_fd(fd).expect("exclusion of a closed member");
    watch.close().unwrap();
}

#[test]
fn negative_fd_rejected() {
    let watch = Watch::open().unwrap();
    let got = watch.include_fd(-1);
    assert!(
        matches!(got, Err(Error::Registration { op: Membership::Include, fd: -1, .. })),
        "got {got:?}"
    );
    let got = watch.exclude_fd(-3);
    assert!(
        matches!(got, Err(Error::Registration { op: Membership::Exclude, fd: -3, .. })),
        "got {got:?}"
    );
    watch.close().unwrap();
}

// Both of two ready descriptors get reported when neither is drained.
#[test]
fn fan_in_fairness() {
    let mut p = Pipe::new();
    let (r2, w2) = nix::unistd::pipe().unwrap();
    let fd1 = p.r_fd;
    let fd2 = r2.as_raw_fd();

    p.watch().include_fd(fd1).unwrap();
    p.watch().include_fd(fd2).unwrap();
    // both writers stay open, as a hang-up counts as read ready
    let mut w2 = File::from(w2);
    p.w.write_all(b"one").unwrap();
    w2.write_all(b"two").unwrap();

    let mut seen = HashSet::new();
    for _ in 0..8 {
        let fd = p.await_fd(HOLDUP_MAX).expect("both are ready");
        assert!(fd == fd1 || fd == fd2, "got unknown fd {fd}");
        seen.insert(fd);
    }
    assert_eq!(seen, HashSet::from([fd1, fd2]));
}

// Drain one, rewait: the other is serviced too.
#[test]
fn fan_in_drain_one() {
    let mut p = Pipe::new();
    let (r2, w2) = nix::unistd::pipe().unwrap();
    let mut r2 = File::from(r2);
    let fd1 = p.r_fd;
    let fd2 = r2.as_raw_fd();

    p.watch().include_fd(fd1).unwrap();
    p.watch().include_fd(fd2).unwrap();
    let mut w2 = File::from(w2);
    p.w.write_all(b"aa").unwrap();
    w2.write_all(b"bb").unwrap();

    let mut drained = Vec::new();
    while drained.len() < 4 {
        let fd = p.await_fd(HOLDUP_MAX).expect("data is pending");
        let mut byte = [0; 1];
        if fd == fd1 {
            p.r.read_exact(&mut byte).unwrap();
        } else {
            r2.read_exact(&mut byte).unwrap();
        }
        drained.push(fd);
    }
    assert!(drained.contains(&fd1) && drained.contains(&fd2), "drained {drained:?}");

    let got = p.await_fd(Duration::from_millis(20));
    assert!(matches!(got, Err(Error::Timeout)), "after drain got {got:?}, want timeout");
}

// A pipe without writer stays read ready once drained, for end-of-file.
#[test]
fn writer_gone_reads_eof() {
    let mut watch = Watch::open().unwrap();
    let (r, w) = nix::unistd::pipe().unwrap();
    let mut r = File::from(r);
    let fd = r.as_raw_fd();
    watch.include_fd(fd).unwrap();
    File::from(w).write_all(b"Hello").unwrap();

    let mut buf = [0; 5];
    assert_eq!(watch.await_fd_with_read(HOLDUP_MAX.into()).ok(), Some(fd));
    r.read_exact(&mut buf).unwrap();

    for _ in 0..2 {
        let got = watch.await_fd_with_read(HOLDUP_MAX.into());
        assert_eq!(got.ok(), Some(fd), "end-of-file is read ready");
    }
    assert_eq!(r.read(&mut buf).unwrap(), 0);
    watch.close().unwrap();
}

// The watch moves across threads.
#[test]
fn send_to_thread() {
    let mut p = Pipe::new();
    let fd = p.r_fd;
    p.watch().include_fd(fd).unwrap();
    p.w.write_all(b"Hello").unwrap();

    let mut watch = p.watch.take().unwrap();
    let got = thread::spawn(move || {
        let got = watch.await_fd_with_read(HOLDUP_MAX.into());
        watch.close().unwrap();
        got
    })
    .join()
    .unwrap();
    assert_eq!(got.ok(), Some(fd));
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn regular_file_not_watchable() {
    let file = tempfile::tempfile().unwrap();
    let fd = file.as_raw_fd();
    let watch = Watch::open().unwrap();
    let got = watch.include_fd(fd);
    assert!(matches!(got, Err(Error::NotWatchable { fd: f }) if f == fd), "got {got:?}");
    watch.close().unwrap();
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[test]
fn regular_file_read_ready() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"Hello").unwrap();
    let reader = File::open(file.path()).unwrap();
    let fd = reader.as_raw_fd();

    let mut watch = Watch::open().unwrap();
    watch.include_fd(fd).unwrap();
    assert_eq!(watch.await_fd_with_read(HOLDUP_MAX.into()).ok(), Some(fd));
    watch.close().unwrap();
}

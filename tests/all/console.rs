use super::*;
use wasi_memfs::Stream;

#[test_log::test]
fn stdout_is_line_buffered() {
    let mut guest = Guest::new();
    assert_eq!(guest.write(1, b"ab\ncd").unwrap(), 5);
    assert_eq!(guest.stdout(), ["ab"]);
    assert_eq!(guest.ctx.console().pending(Stream::Stdout), b"cd");

    assert_eq!(guest.write(1, b"\n").unwrap(), 1);
    assert_eq!(guest.stdout(), ["ab", "cd"]);
    assert!(guest.ctx.console().pending(Stream::Stdout).is_empty());
    assert!(guest.stderr().is_empty());
}

#[test_log::test]
fn streams_are_buffered_separately() {
    let mut guest = Guest::new();
    guest.write(1, b"out ").unwrap();
    guest.write(2, b"err\n").unwrap();
    guest.write(1, b"done\n\n").unwrap();
    assert_eq!(guest.stdout(), ["out done", ""]);
    assert_eq!(guest.stderr(), ["err"]);
}

#[test_log::test]
fn every_iovec_reaches_the_console() {
    let mut guest = Guest::new();
    let a = guest.put(b"hel");
    let b = guest.put(b"lo\nwor");
    let c = guest.put(b"ld\n");
    let (iovs, iovs_len) = guest.iovecs(&[a, b, c]);
    let nwritten = guest.alloc(4);
    let rc = hostcalls::fd_write(&mut guest.ctx, &mut guest.mem, 1, iovs, iovs_len, nwritten);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.u32_at(nwritten), 12);
    assert_eq!(guest.stdout(), ["hello", "world"]);
}

#[test_log::test]
fn console_writes_leave_the_filesystem_alone() {
    let mut guest = Guest::new();
    guest.write(1, b"line\n").unwrap();
    let root = guest.ctx.vfs().root();
    assert_eq!(guest.ctx.vfs().lookup(root, "1"), None);
    assert_eq!(guest.filestat(3).unwrap().size, 0);
}

#[test_log::test]
fn stdin_is_not_writable() {
    let mut guest = Guest::new();
    assert_eq!(guest.write(0, b"nope\n"), Err(Errno::Notcapable));
    assert!(guest.stdout().is_empty());
}

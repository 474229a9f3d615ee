use super::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use wasi_memfs::{CLOCK_PROCESS_CPUTIME_ID, CLOCK_THREAD_CPUTIME_ID};

#[test_log::test]
fn args_round_trip() {
    let mut guest = Guest::with(WasiCtxBuilder::new().args(["prog", "-v", ""]));
    let sizes = guest.alloc(8);
    let rc = hostcalls::args_sizes_get(&mut guest.ctx, &mut guest.mem, sizes, sizes + 4);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.u32_at(sizes), 3);
    assert_eq!(guest.u32_at(sizes + 4), 9);

    let argv = guest.alloc(12);
    let buf = guest.alloc(9);
    let rc = hostcalls::args_get(&mut guest.ctx, &mut guest.mem, argv, buf);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.bytes(buf, 9), b"prog\0-v\0\0");
    assert_eq!(guest.u32_at(argv), buf);
    assert_eq!(guest.u32_at(argv + 4), buf + 5);
    assert_eq!(guest.u32_at(argv + 8), buf + 8);
}

#[test_log::test]
fn environment_round_trip() {
    let mut guest = Guest::with(
        WasiCtxBuilder::new()
            .env("HOME", "/")
            .env("LANG", "C"),
    );
    let sizes = guest.alloc(8);
    let rc = hostcalls::environ_sizes_get(&mut guest.ctx, &mut guest.mem, sizes, sizes + 4);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.u32_at(sizes), 2);
    assert_eq!(guest.u32_at(sizes + 4), 14);

    let environ = guest.alloc(8);
    let buf = guest.alloc(14);
    let rc = hostcalls::environ_get(&mut guest.ctx, &mut guest.mem, environ, buf);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.bytes(buf, 14), b"HOME=/\0LANG=C\0");
    assert_eq!(guest.u32_at(environ + 4), buf + 7);
}

#[test_log::test]
fn empty_args() {
    let mut guest = Guest::new();
    let sizes = guest.alloc(8);
    let rc = hostcalls::args_sizes_get(&mut guest.ctx, &mut guest.mem, sizes, sizes + 4);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!((guest.u32_at(sizes), guest.u32_at(sizes + 4)), (0, 0));
}

#[test_log::test]
fn clocks() {
    let mut guest = Guest::new();
    let out = guest.alloc(8);

    let rc = hostcalls::clock_time_get(&mut guest.ctx, &mut guest.mem, CLOCK_REALTIME, 0, out);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.u64_at(out), 1_700_000_000_123_000_000);

    let rc = hostcalls::clock_time_get(&mut guest.ctx, &mut guest.mem, CLOCK_MONOTONIC, 0, out);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.u64_at(out), 42_000_000);

    let rc = hostcalls::clock_res_get(&mut guest.ctx, &mut guest.mem, CLOCK_REALTIME, out);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.u64_at(out), 1_000);

    for id in [CLOCK_PROCESS_CPUTIME_ID, CLOCK_THREAD_CPUTIME_ID, 7] {
        let rc = hostcalls::clock_res_get(&mut guest.ctx, &mut guest.mem, id, out);
        assert_eq!(errno(rc), Err(Errno::Notcapable));
        let rc = hostcalls::clock_time_get(&mut guest.ctx, &mut guest.mem, id, 0, out);
        assert_eq!(errno(rc), Err(Errno::Notcapable));
    }
}

#[test_log::test]
fn random_fills_exactly() {
    let mut guest = Guest::new();
    let buf = guest.alloc(16);
    guest.mem.as_mut_slice()[buf as usize..][..16].fill(0xee);

    let rc = hostcalls::random_get(&mut guest.ctx, &mut guest.mem, buf, 11);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.bytes(buf, 8), [1u8; 8]);
    assert_eq!(guest.bytes(buf + 8, 3), [2u8; 3]);
    assert_eq!(guest.bytes(buf + 11, 5), [0xeeu8; 5]);

    let rc = hostcalls::random_get(&mut guest.ctx, &mut guest.mem, buf, 0);
    assert_eq!(errno(rc), Ok(()));
    assert_eq!(guest.bytes(buf, 1), [1u8]);
}

#[test_log::test]
fn random_out_of_bounds_faults() {
    let mut guest = Guest::new();
    let rc = hostcalls::random_get(&mut guest.ctx, &mut guest.mem, 64 * 1024 - 4, 8);
    assert_eq!(errno(rc), Err(Errno::Fault));
}

#[test_log::test]
fn bad_pointers_fault() {
    let mut guest = Guest::new();
    let rc = hostcalls::fd_tell(&mut guest.ctx, &mut guest.mem, 3, u32::MAX - 2);
    assert_eq!(errno(rc), Err(Errno::Fault));
    let rc = hostcalls::path_create_directory(&mut guest.ctx, &mut guest.mem, 3, 70_000, 4);
    assert_eq!(errno(rc), Err(Errno::Fault));
    let rc = hostcalls::fd_write(&mut guest.ctx, &mut guest.mem, 1, 70_000, 1, 0);
    assert_eq!(errno(rc), Err(Errno::Fault));
}

#[test_log::test]
fn invalid_utf8_path() {
    let mut guest = Guest::new();
    let (path, path_len) = guest.put(&[0xff, 0xfe]);
    let rc = hostcalls::path_create_directory(&mut guest.ctx, &mut guest.mem, 3, path, path_len);
    assert_eq!(errno(rc), Err(Errno::Ilseq));
}

#[test_log::test]
fn sched_yield() {
    let mut guest = Guest::new();
    assert_eq!(
        errno(hostcalls::sched_yield(&mut guest.ctx, &mut guest.mem)),
        Ok(())
    );
}

#[test_log::test]
fn proc_exit_reaches_the_host() {
    let mut guest = Guest::new();
    let payload = catch_unwind(AssertUnwindSafe(|| {
        hostcalls::proc_exit(&mut guest.ctx, 17);
    }))
    .unwrap_err();
    assert_eq!(payload.downcast_ref::<I32Exit>().map(|e| e.0), Some(17));
}

#[test_log::test]
fn unsupported_calls() {
    let mut guest = Guest::new();
    let ctx = &mut guest.ctx;
    let mem = &mut guest.mem;
    let results = [
        hostcalls::fd_advise(ctx, mem, 3, 0, 0, 0),
        hostcalls::fd_datasync(ctx, mem, 3),
        hostcalls::fd_sync(ctx, mem, 3),
        hostcalls::fd_readdir(ctx, mem, 3, 0, 0, 0, 0),
        hostcalls::fd_renumber(ctx, mem, 3, 4),
        hostcalls::path_link(ctx, mem, 3, 0, 0, 0, 3, 0, 0),
        hostcalls::path_readlink(ctx, mem, 3, 0, 0, 0, 0, 0),
        hostcalls::path_remove_directory(ctx, mem, 3, 0, 0),
        hostcalls::path_rename(ctx, mem, 3, 0, 0, 3, 0, 0),
        hostcalls::path_symlink(ctx, mem, 0, 0, 3, 0, 0),
        hostcalls::path_unlink_file(ctx, mem, 3, 0, 0),
        hostcalls::poll_oneoff(ctx, mem, 0, 0, 1, 0),
        hostcalls::proc_raise(ctx, mem, 9),
        hostcalls::sock_accept(ctx, mem, 3, 0, 0),
        hostcalls::sock_recv(ctx, mem, 3, 0, 0, 0, 0, 0),
        hostcalls::sock_send(ctx, mem, 3, 0, 0, 0, 0),
        hostcalls::sock_shutdown(ctx, mem, 3, 0),
    ];
    for (i, rc) in results.into_iter().enumerate() {
        assert_eq!(errno(rc), Err(Errno::Notcapable), "call #{i}");
    }
}

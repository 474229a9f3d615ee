use super::oflags::*;
use super::*;
use wasi_memfs::{StdHost, StringArrayError};

#[test_log::test]
fn preloaded_files_are_visible_to_the_guest() {
    let mut guest = Guest::with(
        WasiCtxBuilder::new()
            .preload_dir("/empty")
            .preload_file("/data/input.txt", "hello\n")
            .preload_file("/data/nested/more.bin", vec![0, 1, 2]),
    );

    let fd = guest.open("data/input.txt", 0, 0).unwrap();
    assert_eq!(guest.read(fd, 64).unwrap(), b"hello\n");
    let fd = guest.open("/data/nested/more.bin", 0, 0).unwrap();
    assert_eq!(guest.filestat(fd).unwrap().size, 3);
    assert!(guest.open("empty", DIRECTORY, 0).is_ok());
}

#[test_log::test]
fn preloading_twice_replaces_contents() {
    let guest = Guest::with(
        WasiCtxBuilder::new()
            .preload_file("/a", "first version")
            .preload_file("/a", "second"),
    );
    assert_eq!(guest.ctx.file_contents("/a").unwrap(), b"second");
}

#[test_log::test]
fn staged_loading() {
    let mut ctx = WasiCtxBuilder::new().host(TestHost::default()).build().unwrap();
    ctx.stage_path(9).copy_from_slice(b"/cfg/x.rc");
    ctx.materialize_file(4).unwrap().copy_from_slice(b"k=v\n");
    assert_eq!(ctx.file_contents("/cfg/x.rc").unwrap(), b"k=v\n");

    ctx.stage_path(1).copy_from_slice(b"/");
    assert_eq!(ctx.materialize_file(1).map(|_| ()), Err(Errno::Isdir));
}

#[test_log::test]
fn oversized_materialize_is_fbig() {
    let mut ctx = WasiCtxBuilder::new().host(TestHost::default()).build().unwrap();
    ctx.stage_path(4).copy_from_slice(b"/big");
    assert_eq!(ctx.materialize_file(usize::MAX).map(|_| ()), Err(Errno::Fbig));
    assert_eq!(ctx.file_contents("/big").unwrap(), b"");

    ctx.stage_path(4).copy_from_slice(b"/big");
    assert_eq!(ctx.materialize_file(2).unwrap().len(), 2);
}

#[test_log::test]
fn file_contents_errors() {
    let guest = Guest::with(WasiCtxBuilder::new().preload_dir("/d"));
    assert_eq!(guest.ctx.file_contents("/d"), Err(Errno::Isdir));
    assert_eq!(guest.ctx.file_contents("/missing"), Err(Errno::Noent));
    assert_eq!(guest.ctx.file_contents("d"), Err(Errno::Inval));
}

#[test_log::test]
fn build_reports_bad_configuration() {
    let err = WasiCtxBuilder::new()
        .host(TestHost::default())
        .env("BAD\0KEY", "x")
        .build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StringArrayError>(),
        Some(StringArrayError::Nul(_))
    ));

    let err = WasiCtxBuilder::new()
        .host(TestHost::default())
        .preload_file("relative", "x")
        .build()
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Errno>(), Some(&Errno::Inval));
    assert!(format!("{err:#}").contains("relative"));
}

#[test_log::test]
fn std_host_builds() {
    let ctx = WasiCtxBuilder::new().host(StdHost::new()).build().unwrap();
    assert_eq!(ctx.table().len(), 4);
}

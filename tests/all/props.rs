use super::oflags::*;
use super::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_bytes_read_back(data in prop::collection::vec(any::<u8>(), 0..2048)) {
        let mut guest = Guest::new();
        let fd = guest.open("blob", CREAT, 0).unwrap();
        prop_assert_eq!(guest.write(fd, &data).unwrap() as usize, data.len());
        prop_assert_eq!(guest.seek(fd, 0, SEEK_SET).unwrap(), 0);
        prop_assert_eq!(guest.read(fd, data.len() as u32 + 16).unwrap(), data);
    }

    #[test]
    fn chunked_writes_concatenate(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16)) {
        let mut guest = Guest::new();
        let fd = guest.open("log", CREAT, 0).unwrap();
        for chunk in &chunks {
            guest.write(fd, chunk).unwrap();
        }
        let expected = chunks.concat();
        prop_assert_eq!(guest.ctx.file_contents("/log").unwrap(), &expected[..]);
        prop_assert_eq!(guest.tell(fd).unwrap(), expected.len() as u64);
    }

    #[test]
    fn seek_stays_in_bounds(len in 0usize..256, offset in any::<i64>(), whence in 0u32..3) {
        let mut guest = Guest::new();
        let fd = guest.open("f", CREAT, 0).unwrap();
        guest.write(fd, &vec![7u8; len]).unwrap();
        let first = guest.seek(fd, offset, whence).unwrap();
        prop_assert!(first <= len as u64);
        prop_assert_eq!(guest.tell(fd).unwrap(), first);
        if whence != SEEK_CUR {
            prop_assert_eq!(guest.seek(fd, offset, whence).unwrap(), first);
        }
        prop_assert_eq!(guest.seek(fd, 0, SEEK_CUR).unwrap(), first);
    }

    #[test]
    fn random_get_writes_only_its_buffer(len in 0u32..100) {
        let mut guest = Guest::new();
        let buf = guest.alloc(len + 8);
        guest.mem.as_mut_slice()[buf as usize..][..(len + 8) as usize].fill(0xaa);
        let rc = hostcalls::random_get(&mut guest.ctx, &mut guest.mem, buf, len);
        prop_assert_eq!(errno(rc), Ok(()));
        prop_assert!(guest.bytes(buf + len, 8).iter().all(|b| *b == 0xaa));
    }

    #[test]
    fn console_emits_one_line_per_newline(text in "[a-z\n]{0,64}") {
        let mut guest = Guest::new();
        guest.write(1, text.as_bytes()).unwrap();
        let expected: Vec<&str> = text.split('\n').collect();
        let (done, pending) = expected.split_at(expected.len() - 1);
        prop_assert_eq!(guest.stdout(), done);
        prop_assert_eq!(
            guest.ctx.console().pending(wasi_memfs::Stream::Stdout),
            pending[0].as_bytes()
        );
    }
}

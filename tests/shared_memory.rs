// Shared memory backend tests for Linux
// Run with: cargo test --test shared_memory -- --nocapture

#[cfg(target_os = "linux")]
mod linux_tests {
    use fdb_ringbridge::Core::{
        attach_shared_memory, create_shared_memory, RawHandle, SharedMemoryBackend,
    };
    use fdb_ringbridge::Ring::{ChannelKind, RingBuilder};
    use serial_test::serial;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_create_shared_memory() {
        let dir = TempDir::new().unwrap();
        let size = 4096;
        let shm = create_shared_memory(&dir.path().join("region"), size).unwrap();

        assert_eq!(shm.size(), size);
        assert!(!shm.as_ptr().is_null());

        unsafe {
            let slice = std::slice::from_raw_parts_mut(shm.as_ptr(), size);
            assert!(slice.iter().all(|&b| b == 0), "new region should be zero-filled");
            slice[0] = 0x42;
            assert_eq!(slice[0], 0x42);
        }
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taken");
        let _shm = create_shared_memory(&path, 1024).unwrap();

        let err = create_shared_memory(&path, 1024).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_attached_mapping_shares_memory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared");
        let size = 8192;
        let owner = create_shared_memory(&path, size).unwrap();
        let other = attach_shared_memory(&path, size).unwrap();
        assert_eq!(other.size(), size);
        assert_ne!(owner.as_ptr(), other.as_ptr());

        unsafe {
            let a = std::slice::from_raw_parts_mut(owner.as_ptr(), size);
            let b = std::slice::from_raw_parts_mut(other.as_ptr(), size);

            for i in 0..100 {
                a[i] = (i % 256) as u8;
            }
            for i in 0..100 {
                assert_eq!(b[i], (i % 256) as u8);
            }

            b[size - 1] = 0xAA;
            assert_eq!(a[size - 1], 0xAA);
        }
    }

    #[test]
    fn test_attach_too_small() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small");
        let _shm = create_shared_memory(&path, 1024).unwrap();

        let err = attach_shared_memory(&path, 4096).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_raw_handle() {
        let dir = TempDir::new().unwrap();
        let shm = create_shared_memory(&dir.path().join("handle"), 4096).unwrap();

        match shm.raw_handle() {
            RawHandle::Fd(fd) => {
                assert!(fd > 0, "File descriptor should be positive");
            }
        }
    }

    // Uses the real default namespace, so keep it away from parallel runs
    #[test]
    #[serial]
    fn test_default_namespace_roundtrip() {
        if !Path::new(fdb_ringbridge::Ring::DEFAULT_NAMESPACE).is_dir() {
            eprintln!("skipping: no {}", fdb_ringbridge::Ring::DEFAULT_NAMESPACE);
            return;
        }
        let name = format!("fdb_ringbridge_test_{}", std::process::id());

        let mut owner = RingBuilder::new()
            .with_capacity(4096)
            .create_published(&name)
            .unwrap();
        let path = owner.published_path().unwrap();
        assert!(path.exists());

        let mut remote = RingBuilder::new()
            .with_kind(ChannelKind::KernelWritable)
            .attach(&name)
            .unwrap();
        remote.submit(b"hello").unwrap();
        assert_eq!(owner.poll().unwrap(), vec![b"hello".to_vec()]);

        drop(remote);
        drop(owner);
        assert!(!path.exists());
    }
}

#[cfg(not(target_os = "linux"))]
mod non_linux_tests {
    use fdb_ringbridge::Core::{attach_shared_memory, create_shared_memory};
    use std::path::Path;

    #[test]
    fn test_unsupported_platform() {
        let result = create_shared_memory(Path::new("/tmp/unsupported"), 4096);
        assert!(result.is_err());

        if let Err(err) = result {
            assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
        }
    }

    #[test]
    fn test_attach_unsupported_platform() {
        let result = attach_shared_memory(Path::new("/tmp/unsupported"), 4096);
        assert!(result.is_err());

        if let Err(err) = result {
            assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
        }
    }
}

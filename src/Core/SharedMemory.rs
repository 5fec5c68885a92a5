// Shared memory backend for ring channels
// Regions are regular files in a tmpfs-style namespace directory, mapped with mmap

use std::fmt::Debug;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::ptr::NonNull;

/// Shared memory backend trait for memory mapped regions
pub trait SharedMemoryBackend: Send + Sync + Debug {
    /// Get a pointer to the mapped memory region
    fn as_ptr(&self) -> *mut u8;

    /// Get the size of the mapped region in bytes
    fn size(&self) -> usize;

    /// Get the underlying file descriptor
    fn raw_handle(&self) -> RawHandle;
}

/// Platform-specific handle type
#[derive(Debug, Clone, Copy)]
pub enum RawHandle {
    /// Unix file descriptor (Linux)
    Fd(i32),
}

/// Create a new zero-filled shared memory region backed by the file at `path`.
///
/// The file must not exist yet; it is created with mode 0600.
#[cfg(target_os = "linux")]
pub fn create_shared_memory(path: &Path, size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(LinuxSharedMemory::create(path, size)?))
}

/// Map an existing region. Fails if the file is smaller than `min_size`.
#[cfg(target_os = "linux")]
pub fn attach_shared_memory(path: &Path, min_size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Ok(Box::new(LinuxSharedMemory::attach(path, min_size)?))
}

#[cfg(not(target_os = "linux"))]
pub fn create_shared_memory(_path: &Path, _size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn attach_shared_memory(_path: &Path, _min_size: usize) -> io::Result<Box<dyn SharedMemoryBackend>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Shared memory only supported on Linux",
    ))
}

#[cfg(target_os = "linux")]
#[derive(Debug)]
pub struct LinuxSharedMemory {
    ptr: NonNull<u8>,
    size: usize,
    fd: i32,
}

#[cfg(target_os = "linux")]
unsafe impl Send for LinuxSharedMemory {}
#[cfg(target_os = "linux")]
unsafe impl Sync for LinuxSharedMemory {}

#[cfg(target_os = "linux")]
impl LinuxSharedMemory {
    pub fn create(path: &Path, size: usize) -> io::Result<Self> {
        use std::os::fd::IntoRawFd;
        use std::os::unix::fs::OpenOptionsExt;

        if size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "shared memory size must be non-zero",
            ));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)?;

        let fd = file.into_raw_fd();

        // Set size; new pages read as zero
        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            let _ = std::fs::remove_file(path);
            return Err(err);
        }

        match unsafe { Self::map(fd, size) } {
            Ok(ptr) => Ok(Self { ptr, size, fd }),
            Err(err) => {
                let _ = std::fs::remove_file(path);
                Err(err)
            }
        }
    }

    pub fn attach(path: &Path, min_size: usize) -> io::Result<Self> {
        use std::os::fd::IntoRawFd;

        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let actual_size = file.metadata()?.len() as usize;
        if actual_size < min_size || actual_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Shared memory too small at {}: expected at least {} bytes, got {}",
                    path.display(),
                    min_size,
                    actual_size
                ),
            ));
        }

        let fd = file.into_raw_fd();
        let ptr = unsafe { Self::map(fd, actual_size)? };
        Ok(Self {
            ptr,
            size: actual_size,
            fd,
        })
    }

    /// Map `size` bytes of `fd` shared read/write. Closes `fd` on failure.
    unsafe fn map(fd: i32, size: usize) -> io::Result<NonNull<u8>> {
        let ptr = libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        );

        if ptr == libc::MAP_FAILED {
            let err = io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }

        match NonNull::new(ptr as *mut u8) {
            Some(ptr) => Ok(ptr),
            None => {
                libc::close(fd);
                Err(io::Error::new(io::ErrorKind::Other, "mmap returned null"))
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl Drop for LinuxSharedMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
            libc::close(self.fd);
        }
    }
}

#[cfg(target_os = "linux")]
impl SharedMemoryBackend for LinuxSharedMemory {
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn raw_handle(&self) -> RawHandle {
        RawHandle::Fd(self.fd)
    }
}

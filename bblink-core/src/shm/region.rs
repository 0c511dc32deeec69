//! SharedMemoryRegion - shared memory mapping wrapper.
//!
//! Provides safe abstraction over mmap and shm_open for the mailbox and IPC
//! regions shared with the baseband. The peer writes these regions
//! asynchronously, so every access is a bounds-checked volatile copy.

use std::ffi::CString;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use crate::error::SharedMemoryError;

/// Represents a mapped shared memory region.
///
/// This struct owns the mapped memory and will unmap it on drop.
/// Named regions can be shared between processes using the same name;
/// anonymous regions are shared between threads of one process.
pub struct SharedMemoryRegion {
    /// Name of the shared memory object (`anon` for anonymous mappings).
    name: String,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Size of the mapped region in bytes.
    size: usize,
    /// File descriptor for named shared memory objects.
    fd: Option<i32>,
    /// Whether this instance created the SHM (and should unlink on drop).
    is_owner: bool,
}

// SAFETY: SharedMemoryRegion owns its mapping; it can move between threads.
unsafe impl Send for SharedMemoryRegion {}

// SAFETY: all accessors copy through volatile reads/writes of plain data. The
// region is concurrently written by the peer anyway, so no access assumes
// exclusivity; ordering is provided by the mailbox handshake.
unsafe impl Sync for SharedMemoryRegion {}

impl std::fmt::Debug for SharedMemoryRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMemoryRegion")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("is_owner", &self.is_owner)
            .finish()
    }
}

impl SharedMemoryRegion {
    /// Minimum size for a shared memory region (one page).
    pub const MIN_SIZE: usize = 4096;

    /// Maximum size for a shared memory region (1 GB).
    pub const MAX_SIZE: usize = 1024 * 1024 * 1024;

    /// Create a new named shared memory region.
    ///
    /// # Arguments
    /// * `name` - Name of the shared memory object (will be prefixed with /)
    /// * `size` - Size in bytes (must be between MIN_SIZE and MAX_SIZE)
    pub fn create(name: &str, size: usize) -> Result<Self, SharedMemoryError> {
        Self::check_size(name, size)?;

        if name.is_empty() {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: "Name cannot be empty".to_string(),
            });
        }

        let c_name = Self::c_name(name)?;

        // SAFETY: c_name is a valid CString, flags are valid POSIX flags
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_RDWR | libc::O_EXCL,
                0o600,
            )
        };

        if fd < 0 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() == Some(libc::EEXIST) {
                return Err(SharedMemoryError::CreateFailed {
                    name: name.to_string(),
                    reason: "Shared memory already exists".to_string(),
                });
            }
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("shm_open failed: {}", errno),
            });
        }

        // SAFETY: fd is a valid file descriptor
        let result = unsafe { libc::ftruncate(fd, size as libc::off_t) };
        if result < 0 {
            let errno = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("ftruncate failed: {}", errno),
            });
        }

        let ptr = match Self::map(Some(fd), size) {
            Ok(ptr) => ptr,
            Err(e) => {
                unsafe { libc::close(fd) };
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(e);
            }
        };

        tracing::debug!(name = %name, size = size, "Created shared memory region");

        Ok(Self {
            name: name.to_string(),
            ptr,
            size,
            fd: Some(fd),
            is_owner: true,
        })
    }

    /// Open an existing named shared memory region.
    pub fn open(name: &str, size: usize) -> Result<Self, SharedMemoryError> {
        Self::check_size(name, size)?;

        let c_name = Self::c_name(name)?;

        // SAFETY: c_name is a valid CString
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };

        if fd < 0 {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("shm_open failed: {}", std::io::Error::last_os_error()),
            });
        }

        let ptr = match Self::map(Some(fd), size) {
            Ok(ptr) => ptr,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(e);
            }
        };

        tracing::debug!(name = %name, size = size, "Opened shared memory region");

        Ok(Self {
            name: name.to_string(),
            ptr,
            size,
            fd: Some(fd),
            is_owner: false,
        })
    }

    /// Create an anonymous shared mapping, zero-filled.
    ///
    /// Used when the peer runs in the same process (simulator, tests).
    pub fn anonymous(size: usize) -> Result<Self, SharedMemoryError> {
        Self::check_size("anon", size)?;

        let ptr = Self::map(None, size)?;

        tracing::debug!(size = size, "Mapped anonymous shared region");

        Ok(Self {
            name: "anon".to_string(),
            ptr,
            size,
            fd: None,
            is_owner: false,
        })
    }

    fn check_size(name: &str, size: usize) -> Result<(), SharedMemoryError> {
        if size < Self::MIN_SIZE {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("Size {} is below minimum {}", size, Self::MIN_SIZE),
            });
        }
        if size > Self::MAX_SIZE {
            return Err(SharedMemoryError::CreateFailed {
                name: name.to_string(),
                reason: format!("Size {} exceeds maximum {}", size, Self::MAX_SIZE),
            });
        }
        Ok(())
    }

    fn c_name(name: &str) -> Result<CString, SharedMemoryError> {
        CString::new(format!("/{}", name)).map_err(|e| SharedMemoryError::CreateFailed {
            name: name.to_string(),
            reason: format!("Invalid name: {}", e),
        })
    }

    fn map(fd: Option<i32>, size: usize) -> Result<NonNull<u8>, SharedMemoryError> {
        let (flags, fd) = match fd {
            Some(fd) => (libc::MAP_SHARED, fd),
            None => (libc::MAP_SHARED | libc::MAP_ANONYMOUS, -1),
        };

        // SAFETY: size is validated, fd is either valid or -1 for anonymous maps
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                flags,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(SharedMemoryError::MapFailed {
                reason: format!("mmap failed: {}", std::io::Error::last_os_error()),
            });
        }

        NonNull::new(ptr as *mut u8).ok_or_else(|| SharedMemoryError::MapFailed {
            reason: "mmap returned null".to_string(),
        })
    }

    /// Get the name of this shared memory region.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size of this shared memory region.
    pub fn size(&self) -> usize {
        self.size
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), SharedMemoryError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(SharedMemoryError::OutOfBounds {
                offset,
                len,
                size: self.size,
            }),
        }
    }

    /// Volatile read of a native-endian `u32`.
    pub fn read_u32(&self, offset: usize) -> Result<u32, SharedMemoryError> {
        self.read_struct::<u32>(offset)
    }

    /// Volatile write of a native-endian `u32`.
    pub fn write_u32(&self, offset: usize, value: u32) -> Result<(), SharedMemoryError> {
        self.write_struct(offset, value)
    }

    /// Snapshot a plain-data value out of the region.
    ///
    /// `T` must be valid for every bit pattern (integers, arrays of integers,
    /// `repr(C)` aggregates thereof); the peer may have written anything.
    pub fn read_struct<T: Copy>(&self, offset: usize) -> Result<T, SharedMemoryError> {
        self.check_range(offset, size_of::<T>())?;

        // SAFETY: range checked above; T is plain data per the contract above
        unsafe {
            let src = self.ptr.as_ptr().add(offset) as *const T;
            if (src as usize) % align_of::<T>() == 0 {
                Ok(std::ptr::read_volatile(src))
            } else {
                Ok(std::ptr::read_unaligned(src))
            }
        }
    }

    /// Write a plain-data value into the region.
    pub fn write_struct<T: Copy>(&self, offset: usize, value: T) -> Result<(), SharedMemoryError> {
        self.check_range(offset, size_of::<T>())?;

        // SAFETY: range checked above
        unsafe {
            let dst = self.ptr.as_ptr().add(offset) as *mut T;
            if (dst as usize) % align_of::<T>() == 0 {
                std::ptr::write_volatile(dst, value);
            } else {
                std::ptr::write_unaligned(dst, value);
            }
        }
        Ok(())
    }

    /// Copy `len` bytes out of the region.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, SharedMemoryError> {
        self.check_range(offset, len)?;

        let mut out = vec![0u8; len];
        // SAFETY: range checked above; destination is a fresh buffer
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr().add(offset), out.as_mut_ptr(), len);
        }
        Ok(out)
    }

    /// Copy `data` into the region.
    pub fn write_bytes(&self, offset: usize, data: &[u8]) -> Result<(), SharedMemoryError> {
        self.check_range(offset, data.len())?;

        // SAFETY: range checked above; source is a distinct Rust slice
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                self.ptr.as_ptr().add(offset),
                data.len(),
            );
        }
        Ok(())
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and size were set during creation
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %std::io::Error::last_os_error(),
                "Failed to unmap shared memory"
            );
        }

        if let Some(fd) = self.fd {
            // SAFETY: fd was opened during creation
            unsafe { libc::close(fd) };
        }

        if self.is_owner {
            if let Ok(c_name) = Self::c_name(&self.name) {
                // SAFETY: c_name is a valid CString
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                tracing::debug!(name = %self.name, "Unlinked shared memory region");
            }
        }
    }
}

//! Executable memory management using mmap.
//!
//! A region is mapped read-write, filled with code, then switched to
//! read-execute exactly once. It is never writable and executable at the
//! same time.

use std::io;
use std::ptr::NonNull;

use thiserror::Error;

/// Error type for memory operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory allocation failed: {0}")]
    AllocationFailed(#[source] io::Error),
    #[error("memory protection change failed: {0}")]
    ProtectionFailed(#[source] io::Error),
    #[error("memory is already executable")]
    AlreadyExecutable,
    #[error("invalid memory size: {requested} bytes at offset {offset} (region is {size} bytes)")]
    InvalidSize {
        offset: usize,
        requested: usize,
        size: usize,
    },
}

/// A block of executable memory allocated via mmap.
///
/// The memory is initially writable. Call `make_executable()` to make it
/// executable (and read-only) before calling the generated code.
pub struct ExecutableMemory {
    ptr: NonNull<u8>,
    size: usize,
    executable: bool,
}

impl ExecutableMemory {
    /// Allocate a new block of memory with at least the given size.
    /// The memory is initially writable but not executable.
    pub fn new(size: usize) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::InvalidSize {
                offset: 0,
                requested: 0,
                size: 0,
            });
        }

        // Round up to page size
        let page_size = page_size();
        let aligned_size = size.checked_next_multiple_of(page_size).ok_or_else(|| {
            MemoryError::AllocationFailed(io::Error::from(io::ErrorKind::OutOfMemory))
        })?;

        let ptr = mmap_alloc(aligned_size)?;
        log::debug!(
            target: "tinyjit::memory",
            "mapped {} bytes (rw-) at {:p}",
            aligned_size,
            ptr
        );

        Ok(Self {
            ptr,
            size: aligned_size,
            executable: false,
        })
    }

    /// Get a pointer to the memory.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Get the size of the allocated memory.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Check if the memory is executable.
    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// The whole region as a mutable slice.
    /// Returns None once the memory is executable.
    pub fn writable_region(&mut self) -> Option<&mut [u8]> {
        if self.executable {
            return None;
        }
        // SAFETY: the mapping is `size` bytes, readable and writable, and
        // owned exclusively by `self`.
        Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) })
    }

    /// Read back the region's contents.
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: the mapping is readable in both states.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    /// Write bytes to the memory at the given offset.
    /// Returns an error if the memory is executable or if the write would overflow.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let size = self.size;
        let region = self.writable_region().ok_or(MemoryError::AlreadyExecutable)?;

        let end = offset
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or(MemoryError::InvalidSize {
                offset,
                requested: data.len(),
                size,
            })?;

        region[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Make the memory executable (and read-only).
    /// After this call, the memory can no longer be written to.
    pub fn make_executable(&mut self) -> Result<(), MemoryError> {
        if self.executable {
            return Err(MemoryError::AlreadyExecutable);
        }

        let result = unsafe {
            libc::mprotect(
                self.ptr.as_ptr() as *mut libc::c_void,
                self.size,
                libc::PROT_READ | libc::PROT_EXEC,
            )
        };

        if result != 0 {
            return Err(MemoryError::ProtectionFailed(io::Error::last_os_error()));
        }

        log::debug!(
            target: "tinyjit::memory",
            "protected {} bytes (r-x) at {:p}",
            self.size,
            self.ptr
        );
        self.executable = true;
        Ok(())
    }

    /// Entry point of the generated code.
    /// Returns None until the memory is executable.
    pub fn entry_pointer(&self) -> Option<*const u8> {
        self.executable.then(|| self.as_ptr())
    }

    /// Get a function pointer to the start of the memory.
    /// Returns None if the memory is not executable or `F` is not pointer-sized.
    ///
    /// # Safety
    /// The caller must ensure that the memory contains valid machine code
    /// for the target architecture, that `F` is an `extern "C" fn` type
    /// matching that code, and that the pointer is not called after `self`
    /// is dropped.
    pub unsafe fn as_fn<F>(&self) -> Option<F>
    where
        F: Copy,
    {
        let entry = self.entry_pointer()?;

        if std::mem::size_of::<F>() != std::mem::size_of::<*const u8>() {
            return None;
        }

        // SAFETY: Caller guarantees F is a function pointer matching the code
        Some(unsafe { std::mem::transmute_copy(&entry) })
    }
}

impl Drop for ExecutableMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.size);
        }
        log::debug!(target: "tinyjit::memory", "unmapped {} bytes at {:p}", self.size, self.ptr);
    }
}

// ExecutableMemory owns its mapping and every mutation goes through &mut self
unsafe impl Send for ExecutableMemory {}
unsafe impl Sync for ExecutableMemory {}

/// Get the page size for the current system.
fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}

/// Allocate read-write anonymous memory using mmap.
fn mmap_alloc(size: usize) -> Result<NonNull<u8>, MemoryError> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };

    if ptr == libc::MAP_FAILED {
        return Err(MemoryError::AllocationFailed(io::Error::last_os_error()));
    }

    NonNull::new(ptr as *mut u8).ok_or_else(|| {
        MemoryError::AllocationFailed(io::Error::other("mmap returned a null mapping"))
    })
}

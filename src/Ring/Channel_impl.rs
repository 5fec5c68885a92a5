use std::io;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crossbeam_utils::CachePadded;
use std::sync::atomic::AtomicU32;

use super::layout::{
    record_footprint, region_size, RecordHeader, RingHeader, DATA_OFFSET, MAX_CAPACITY,
    MIN_CAPACITY, RECORD_BUSY_BIT, RECORD_DISCARD_BIT, RECORD_HEADER_SIZE, RECORD_LEN_MASK,
    RING_MAGIC, RING_VERSION,
};
use super::Channel::{ChannelKind, ChannelState, RingChannel};
use crate::error::ChannelError;
use crate::Core::SharedMemory::{attach_shared_memory, create_shared_memory};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

fn staging_path(namespace: &Path) -> PathBuf {
    let seq = STAGING_COUNTER.fetch_add(1, Relaxed);
    namespace.join(format!(".ring-{}-{}", std::process::id(), seq))
}

fn validate_capacity(capacity: usize) -> Result<(), ChannelError> {
    if !capacity.is_power_of_two() || !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
        return Err(ChannelError::InvalidCapacity {
            capacity,
            min: MIN_CAPACITY,
            max: MAX_CAPACITY,
        });
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ChannelError> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(ChannelError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid channel name `{}`", name),
        )));
    }
    Ok(())
}

impl RingChannel {
    /// Create a new, empty ring of `capacity` bytes in `namespace`.
    ///
    /// The backing file gets a private name until [`publish`](Self::publish)
    /// is called.
    pub fn create(
        namespace: impl Into<PathBuf>,
        kind: ChannelKind,
        capacity: usize,
    ) -> Result<Self, ChannelError> {
        validate_capacity(capacity)?;

        let namespace = namespace.into();
        let staging = staging_path(&namespace);
        let shm = create_shared_memory(&staging, region_size(capacity))?;

        let header = shm.as_ptr() as *mut RingHeader;
        unsafe {
            ptr::write(
                header,
                RingHeader {
                    magic: RING_MAGIC,
                    version: RING_VERSION,
                    kind: kind as u32,
                    capacity: capacity as u64,
                    closed: AtomicU32::new(0),
                    reserved: 0,
                    consumer_pos: CachePadded::new(AtomicU64::new(0)),
                    producer_pos: CachePadded::new(AtomicU64::new(0)),
                },
            );
        }
        let data = unsafe { shm.as_ptr().add(DATA_OFFSET) };

        tracing::debug!(?kind, capacity, path = %staging.display(), "created ring channel");

        Ok(Self {
            shm,
            header,
            data,
            capacity,
            mask: capacity - 1,
            kind,
            state: ChannelState::Created,
            namespace,
            name: None,
            staging: Some(staging),
            owner: true,
            keep_published: false,
        })
    }

    /// Attach to a ring another process (or handle) published as `name`.
    pub fn attach(namespace: impl Into<PathBuf>, name: &str) -> Result<Self, ChannelError> {
        validate_name(name)?;
        let namespace = namespace.into();
        let path = namespace.join(name);
        let shm = attach_shared_memory(&path, DATA_OFFSET)?;

        let header = shm.as_ptr() as *const RingHeader;
        let (capacity, kind) = unsafe {
            let h = &*header;
            if h.magic != RING_MAGIC {
                return Err(ChannelError::InvalidLayout(format!(
                    "bad magic {:#x} at {}",
                    h.magic,
                    path.display()
                )));
            }
            if h.version != RING_VERSION {
                return Err(ChannelError::InvalidLayout(format!(
                    "unsupported version {} (expected {})",
                    h.version, RING_VERSION
                )));
            }
            let capacity = h.capacity as usize;
            if validate_capacity(capacity).is_err() || shm.size() < region_size(capacity) {
                return Err(ChannelError::InvalidLayout(format!(
                    "capacity {} does not fit a region of {} bytes",
                    capacity,
                    shm.size()
                )));
            }
            let kind = ChannelKind::from_raw(h.kind).ok_or_else(|| {
                ChannelError::InvalidLayout(format!("unknown channel kind {}", h.kind))
            })?;
            (capacity, kind)
        };
        let data = unsafe { shm.as_ptr().add(DATA_OFFSET) };

        tracing::debug!(?kind, capacity, path = %path.display(), "attached ring channel");

        Ok(Self {
            shm,
            header,
            data,
            capacity,
            mask: capacity - 1,
            kind,
            state: ChannelState::Published,
            namespace,
            name: Some(name.to_string()),
            staging: None,
            owner: false,
            keep_published: true,
        })
    }

    /// Bind the ring to `name` in its namespace so other processes can
    /// [`attach`](Self::attach) to it.
    pub fn publish(&mut self, name: &str) -> Result<(), ChannelError> {
        self.ensure_open()?;
        if let Some(existing) = &self.name {
            return Err(ChannelError::AlreadyPublished(existing.clone()));
        }
        validate_name(name)?;

        let Some(staging) = self.staging.as_ref() else {
            // Only reachable once the published name was removed behind our back
            return Err(ChannelError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "backing file was removed externally; the channel cannot be republished",
            )));
        };
        let target = self.namespace.join(name);

        // link(2) refuses to replace an existing name, which makes the bind atomic
        std::fs::hard_link(staging, &target).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ChannelError::NameInUse(name.to_string()),
            // EACCES and EPERM both land here
            io::ErrorKind::PermissionDenied => ChannelError::PermissionDenied(name.to_string()),
            _ => ChannelError::Io(e),
        })?;

        if let Err(e) = std::fs::remove_file(staging) {
            tracing::warn!(path = %staging.display(), error = %e, "failed to remove staging file");
        }
        self.staging = None;
        self.name = Some(name.to_string());
        if self.state == ChannelState::Created {
            self.state = ChannelState::Published;
        }
        tracing::info!(name, path = %target.display(), "published ring channel");
        Ok(())
    }

    /// Remove the published name. Only the owner may unpublish.
    ///
    /// An open channel moves back to a private staging name and may be
    /// published again. A closed channel's backing file is removed.
    pub fn unpublish(&mut self) -> Result<(), ChannelError> {
        let Some(name) = self.name.clone() else {
            return Ok(());
        };
        if !self.owner {
            return Err(ChannelError::PermissionDenied(name));
        }

        let published = self.namespace.join(&name);
        if self.state == ChannelState::Closed {
            match std::fs::remove_file(&published) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            let staging = staging_path(&self.namespace);
            match std::fs::rename(&published, &staging) {
                Ok(()) => self.staging = Some(staging),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            if self.state == ChannelState::Published {
                self.state = ChannelState::Created;
            }
        }
        self.name = None;
        tracing::info!(name = %name, "unpublished ring channel");
        Ok(())
    }

    /// Drain every committed record, oldest first. Never blocks.
    ///
    /// Stops at a record the writer has reserved but not yet committed and
    /// leaves it for the next poll.
    pub fn poll(&mut self) -> Result<Vec<Vec<u8>>, ChannelError> {
        self.ensure_open()?;

        let header = self.header();
        let mut cons = header.consumer_pos.load(Relaxed);
        let prod = header.producer_pos.load(Acquire);
        self.used_bytes(cons, prod)?;
        let mut records = Vec::new();

        while cons < prod {
            let word = unsafe { self.record_header(cons) }.len.load(Acquire);
            if word & RECORD_BUSY_BIT != 0 {
                break;
            }
            let len = (word & RECORD_LEN_MASK) as usize;
            let footprint = record_footprint(len);
            if len > self.max_record_size() || cons + footprint as u64 > prod {
                return Err(ChannelError::InvalidLayout(format!(
                    "record of {} bytes at position {} overruns producer position {}",
                    len, cons, prod
                )));
            }
            if word & RECORD_DISCARD_BIT == 0 {
                let mut payload = vec![0u8; len];
                unsafe { self.copy_out(cons + RECORD_HEADER_SIZE as u64, &mut payload) };
                records.push(payload);
            }
            cons += footprint as u64;
        }

        header.consumer_pos.store(cons, Release);

        if records.is_empty() && header.closed.load(Acquire) != 0 {
            return Err(ChannelError::ChannelClosed);
        }
        self.state = ChannelState::Open;
        Ok(records)
    }

    /// Append one record for the remote side.
    ///
    /// `BufferFull` leaves the ring untouched; the caller decides whether to
    /// retry or drop.
    pub fn submit(&mut self, raw: &[u8]) -> Result<(), ChannelError> {
        let mut reservation = self.reserve(raw.len())?;
        reservation.write(0, raw)?;
        reservation.commit();
        Ok(())
    }

    /// Claim space for a record of `len` bytes. The reader stops at the
    /// record until it is committed or discarded.
    pub fn reserve(&mut self, len: usize) -> Result<Reservation<'_>, ChannelError> {
        self.ensure_open()?;
        let header = self.header();
        if header.closed.load(Acquire) != 0 {
            return Err(ChannelError::ChannelClosed);
        }

        let max = self.max_record_size();
        if len > max {
            return Err(ChannelError::RecordTooLarge { len, max });
        }

        let needed = record_footprint(len);
        let cons = header.consumer_pos.load(Acquire);
        let prod = header.producer_pos.load(Relaxed);
        let free = self.capacity - self.used_bytes(cons, prod)?;
        if needed > free {
            return Err(ChannelError::BufferFull { needed, free });
        }

        unsafe {
            let rec = self.record_header_ptr(prod);
            ptr::addr_of_mut!((*rec).reserved).write(0);
            (*rec).len.store(len as u32 | RECORD_BUSY_BIT, Relaxed);
        }
        header.producer_pos.store(prod + needed as u64, Release);
        self.state = ChannelState::Open;

        Ok(Reservation {
            channel: self,
            pos: prod,
            len,
            done: false,
        })
    }

    /// Largest payload a single record may carry.
    pub fn max_record_size(&self) -> usize {
        (self.capacity - RECORD_HEADER_SIZE).min(RECORD_LEN_MASK as usize)
    }

    /// Bytes written by the producer and not yet consumed.
    ///
    /// Reports 0 for corrupt cursors; `poll` and `reserve` surface those as
    /// `InvalidLayout`.
    pub fn pending_bytes(&self) -> usize {
        let header = self.header();
        let prod = header.producer_pos.load(Acquire);
        let cons = header.consumer_pos.load(Acquire);
        self.used_bytes(cons, prod).unwrap_or(0)
    }

    /// Distance between the cursors. The remote side writes one of them, so
    /// it is checked against the ring bounds.
    fn used_bytes(&self, cons: u64, prod: u64) -> Result<usize, ChannelError> {
        match prod.checked_sub(cons) {
            Some(used) if used <= self.capacity as u64 => Ok(used as usize),
            _ => Err(ChannelError::InvalidLayout(format!(
                "consumer position {} and producer position {} are inconsistent",
                cons, prod
            ))),
        }
    }

    /// True once either side has closed the ring.
    pub fn is_closed(&self) -> bool {
        self.state == ChannelState::Closed || self.header().closed.load(Acquire) != 0
    }

    /// Mark the ring closed for both sides. Terminal.
    pub fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.header().closed.store(1, Release);
        self.state = ChannelState::Closed;
        tracing::debug!(name = ?self.name, "closed ring channel");
    }

    fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.state == ChannelState::Closed {
            return Err(ChannelError::ChannelClosed);
        }
        Ok(())
    }

    #[inline]
    unsafe fn record_header_ptr(&self, pos: u64) -> *mut RecordHeader {
        self.data.add(pos as usize & self.mask) as *mut RecordHeader
    }

    #[inline]
    unsafe fn record_header(&self, pos: u64) -> &RecordHeader {
        &*self.record_header_ptr(pos)
    }

    /// Copy `src` into the data area starting at `pos`, wrapping at the end.
    unsafe fn copy_in(&self, pos: u64, src: &[u8]) {
        let idx = pos as usize & self.mask;
        let first = src.len().min(self.capacity - idx);
        ptr::copy_nonoverlapping(src.as_ptr(), self.data.add(idx), first);
        if first < src.len() {
            ptr::copy_nonoverlapping(src.as_ptr().add(first), self.data, src.len() - first);
        }
    }

    /// Copy from the data area starting at `pos` into `dst`, wrapping at the end.
    unsafe fn copy_out(&self, pos: u64, dst: &mut [u8]) {
        let idx = pos as usize & self.mask;
        let first = dst.len().min(self.capacity - idx);
        ptr::copy_nonoverlapping(self.data.add(idx), dst.as_mut_ptr(), first);
        if first < dst.len() {
            ptr::copy_nonoverlapping(self.data, dst.as_mut_ptr().add(first), dst.len() - first);
        }
    }
}

impl Drop for RingChannel {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        if self.keep_published && self.name.is_some() {
            // Left pinned for external reattachment
            tracing::debug!(name = ?self.name, "leaving ring channel published");
            return;
        }
        self.close();
        if let Err(e) = self.unpublish() {
            tracing::warn!(name = ?self.name, error = %e, "failed to unpublish ring channel");
        }
        if let Some(staging) = self.staging.take() {
            let _ = std::fs::remove_file(staging);
        }
    }
}

/// Space claimed in the ring for one record.
///
/// Dropping a reservation without committing it discards the record.
pub struct Reservation<'a> {
    channel: &'a mut RingChannel,
    pos: u64,
    len: usize,
    done: bool,
}

impl Reservation<'_> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy `bytes` into the record payload at `offset`.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ChannelError> {
        let end = offset.saturating_add(bytes.len());
        if end > self.len {
            return Err(ChannelError::RecordTooLarge {
                len: end,
                max: self.len,
            });
        }
        unsafe {
            self.channel
                .copy_in(self.pos + (RECORD_HEADER_SIZE + offset) as u64, bytes)
        };
        Ok(())
    }

    /// Publish the record to the reader.
    pub fn commit(mut self) {
        self.finish(self.len as u32);
    }

    /// Give the space back; the reader skips the record.
    pub fn discard(mut self) {
        self.finish(self.len as u32 | RECORD_DISCARD_BIT);
    }

    fn finish(&mut self, word: u32) {
        unsafe { self.channel.record_header(self.pos) }
            .len
            .store(word, Release);
        self.done = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.finish(self.len as u32 | RECORD_DISCARD_BIT);
        }
    }
}

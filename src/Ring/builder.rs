use super::Channel::{ChannelKind, RingChannel};
use crate::error::ChannelError;
use std::path::PathBuf;

/// Default directory holding published ring names.
pub const DEFAULT_NAMESPACE: &str = "/dev/shm";

/// Default data area size (256 KiB).
pub const DEFAULT_CAPACITY: usize = 256 * 1024;

pub struct RingBuilder {
    namespace: PathBuf,
    kind: ChannelKind,
    capacity: usize,
    keep_published: bool,
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self {
            namespace: PathBuf::from(DEFAULT_NAMESPACE),
            kind: ChannelKind::KernelWritable,
            capacity: DEFAULT_CAPACITY,
            keep_published: false,
        }
    }
}

impl RingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: impl Into<PathBuf>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_kind(mut self, kind: ChannelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Leave the ring published after the owning handle is dropped.
    pub fn keep_published(mut self, keep: bool) -> Self {
        self.keep_published = keep;
        self
    }

    /// Create a fresh, unpublished ring.
    pub fn create(self) -> Result<RingChannel, ChannelError> {
        let mut channel = RingChannel::create(self.namespace, self.kind, self.capacity)?;
        channel.set_keep_published(self.keep_published);
        Ok(channel)
    }

    /// Create a ring and publish it as `name`.
    pub fn create_published(self, name: &str) -> Result<RingChannel, ChannelError> {
        let mut channel = self.create()?;
        channel.publish(name)?;
        Ok(channel)
    }

    /// Attach to an already published ring. Kind and capacity come from the
    /// shared header; a kind mismatch is reported as `InvalidLayout`.
    pub fn attach(self, name: &str) -> Result<RingChannel, ChannelError> {
        let channel = RingChannel::attach(self.namespace, name)?;
        if channel.kind() != self.kind {
            return Err(ChannelError::InvalidLayout(format!(
                "`{}` is {:?}, expected {:?}",
                name,
                channel.kind(),
                self.kind
            )));
        }
        Ok(channel)
    }
}

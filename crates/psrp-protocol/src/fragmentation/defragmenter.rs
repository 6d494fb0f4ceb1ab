use tracing::trace;

use super::{DefragmentResult, fragment::Fragment};
use crate::{PowerShellRemotingError, PowerShellRemotingMessage};
use std::collections::HashMap;

/// Buffer for accumulating fragments during defragmentation
#[derive(Debug)]
struct FragmentBuffer {
    fragments: Vec<Fragment>,
    next_fragment_id: u64,
    is_complete: bool,
}

impl FragmentBuffer {
    fn new() -> Self {
        Self {
            fragments: Vec::new(),
            next_fragment_id: 0,
            is_complete: false,
        }
    }

    /// Add a fragment to this buffer, rejecting anything but the next
    /// expected fragment-id for this object.
    fn add_fragment(&mut self, fragment: Fragment) -> Result<(), PowerShellRemotingError> {
        if fragment.fragment_id != self.next_fragment_id {
            return Err(PowerShellRemotingError::ProtocolViolation(format!(
                "out-of-order fragment for object {}: expected fragment_id {}, got {}",
                fragment.object_id, self.next_fragment_id, fragment.fragment_id
            )));
        }

        self.next_fragment_id += 1;
        if fragment.end {
            self.is_complete = true;
        }
        self.fragments.push(fragment);
        Ok(())
    }

    /// Reassemble all fragments into complete message data
    fn reassemble(&self) -> Vec<u8> {
        let total_len: usize = self.fragments.iter().map(|f| f.data.len()).sum();
        let mut out = Vec::with_capacity(total_len);

        for f in &self.fragments {
            out.extend_from_slice(&f.data);
        }
        out
    }
}

/// Defragmenter handles defragmentation of incoming PowerShell remoting message fragments
/// with internal state management
#[derive(Debug)]
pub struct Defragmenter {
    buffers: HashMap<u64, FragmentBuffer>,
    /// Maximum size, in bytes, a single fragment's data payload may be.
    /// Guards against a malicious or buggy peer claiming an unbounded
    /// blob-length in the fragment header.
    max_fragment_size: usize,
}

impl Default for Defragmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Defragmenter {
    const DEFAULT_MAX_FRAGMENT_SIZE: usize = 16 * 1024 * 1024;

    /// Create a new defragmenter with the default 16 MiB per-fragment limit.
    pub fn new() -> Self {
        Self::with_max_fragment_size(Self::DEFAULT_MAX_FRAGMENT_SIZE)
    }

    /// Create a new defragmenter that rejects any fragment whose data
    /// exceeds `max_fragment_size` bytes.
    pub fn with_max_fragment_size(max_fragment_size: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            max_fragment_size,
        }
    }

    /// Process incoming packet data containing one or more fragments
    /// Returns complete messages if any are ready, or Incomplete if still waiting
    pub fn defragment(
        &mut self,
        packet_data: &[u8],
    ) -> Result<DefragmentResult, PowerShellRemotingError> {
        let mut remaining_data = packet_data;
        let mut completed_messages = Vec::new();

        // Parse all fragments from the packet data
        while !remaining_data.is_empty() {
            let (fragment, rest) = Fragment::unpack(remaining_data)?;
            trace!(
                fragment = ?fragment,
                "Defragmenter unpacked fragment"
            );

            remaining_data = rest;
            trace!(
                remaining_data_len = remaining_data.len(),
                "Remaining data after unpacking fragment"
            );

            if fragment.data.len() > self.max_fragment_size {
                return Err(PowerShellRemotingError::FramingLimitExceeded {
                    size: fragment.data.len(),
                    limit: self.max_fragment_size,
                });
            }

            let object_id = fragment.object_id;

            // Handle complete single-fragment message
            if fragment.start && fragment.end {
                let message = Self::parse_message(fragment.data)?;
                completed_messages.push(message);
                continue;
            }

            // Get or create buffer for this object
            let buffer = self
                .buffers
                .entry(object_id)
                .or_insert_with(FragmentBuffer::new);

            // Handle start fragment - reset buffer
            if fragment.start {
                *buffer = FragmentBuffer::new();
            }

            // Add fragment to buffer, enforcing strict fragment-id order
            if let Err(e) = buffer.add_fragment(fragment) {
                self.buffers.remove(&object_id);
                return Err(e);
            }

            // Check if message is complete
            let is_complete = self.buffers.get(&object_id).is_some_and(|b| b.is_complete);
            if is_complete {
                let buffer = self.buffers.remove(&object_id).expect("just checked");
                let complete_data = buffer.reassemble();
                let message = Self::parse_message(complete_data)?;
                completed_messages.push(message);
            }
        }

        if completed_messages.is_empty() {
            Ok(DefragmentResult::Incomplete)
        } else {
            Ok(DefragmentResult::Complete(completed_messages))
        }
    }

    /// Get the number of incomplete message buffers
    pub fn pending_count(&self) -> usize {
        self.buffers.len()
    }

    /// Clear all incomplete buffers (useful for error recovery)
    pub fn clear_buffers(&mut self) {
        self.buffers.clear();
    }

    /// Parse a complete message from reassembled data
    fn parse_message(data: Vec<u8>) -> Result<PowerShellRemotingMessage, PowerShellRemotingError> {
        let mut cursor = std::io::Cursor::new(data);
        PowerShellRemotingMessage::parse(&mut cursor)
    }
}

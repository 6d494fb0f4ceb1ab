pub mod defragmenter;
pub mod fragment;
pub mod fragmenter;


pub use defragmenter::Defragmenter;
pub use fragment::Fragment;
pub use fragmenter::Fragmenter;

use crate::PowerShellRemotingMessage;

/// Result of feeding a chunk of wire bytes into a [`Defragmenter`].
#[derive(Debug)]
pub enum DefragmentResult {
    /// Zero or more complete messages were reassembled from this call.
    Complete(Vec<PowerShellRemotingMessage>),
    /// No message finished reassembling yet; more fragments are needed.
    Incomplete,
}

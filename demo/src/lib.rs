//! Demo recording and playback for snapdelta snapshot streams.
//!
//! A demo is a metadata record followed by length-prefixed records and an
//! end-of-stream sentinel:
//!
//! ```text
//! u32 len | metadata header + key\0value\0 block
//! u32 len | record bytes
//! ...
//! 0xFFFFFFFF
//! ```
//!
//! [`DemoRecorder`] and [`DemoPlayer`] work with raw records.
//! [`DemoRecorder::record_snapshot`] and [`DemoPlayback`] add snapshot frames
//! on top: a bootstrap frame first, then deltas against the previous frame.
//!
//! # Example
//!
//! ```
//! use bitstream::MessageBuffer;
//! use demo::{DemoConfig, DemoMetadata, DemoPlayer, DemoRead, DemoRecorder};
//!
//! let mut metadata = DemoMetadata::new();
//! metadata.set("map", "e1m1").unwrap();
//!
//! let mut recorder = DemoRecorder::start(Vec::new(), &metadata, DemoConfig::default()).unwrap();
//! recorder.buffer_mut().write_u32(7).unwrap();
//! let bytes = recorder.stop().unwrap();
//!
//! let mut player = DemoPlayer::open(bytes.as_slice(), &DemoConfig::default()).unwrap();
//! let mut msg = MessageBuffer::new(1024);
//! assert_eq!(player.read_message(&mut msg).unwrap(), DemoRead::Message);
//! assert_eq!(msg.read_u32().unwrap(), 7);
//! assert_eq!(player.read_message(&mut msg).unwrap(), DemoRead::EndOfStream);
//! ```

mod config;
mod error;
mod metadata;
mod playback;
mod player;
mod recorder;
mod rewrite;

pub use config::{DemoConfig, METADATA_MAX_SIZE};
pub use error::{DemoError, DemoResult, MetadataError};
pub use metadata::{
    metadata_record_len, read_metadata_record, write_metadata_record, DemoMetadata,
    METADATA_HEADER_SIZE, RECORD_PREFIX_SIZE,
};
pub use playback::DemoPlayback;
pub use player::{DemoPlayer, DemoRead};
pub use recorder::{DemoRecorder, END_OF_STREAM};
pub use rewrite::{read_metadata, rewrite_metadata};

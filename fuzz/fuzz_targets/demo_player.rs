#![no_main]

use bitstream::MessageBuffer;
use demo::{DemoConfig, DemoPlayback, DemoPlayer, DemoRead};
use libfuzzer_sys::fuzz_target;
use schema::{FieldKind, Schema};

fuzz_target!(|data: &[u8]| {
    let config = DemoConfig::for_testing();
    if let Ok(mut player) = DemoPlayer::open(data, &config) {
        let mut msg = MessageBuffer::new(config.max_message_size);
        for _ in 0..256 {
            match player.read_message(&mut msg) {
                Ok(DemoRead::Message) => assert!(msg.cursize() <= msg.maxsize()),
                Ok(DemoRead::EndOfStream) | Err(_) => break,
            }
        }
    }

    let schema = Schema::builder("fuzz")
        .field("health", FieldKind::I16)
        .field("model", FieldKind::string(16))
        .build()
        .unwrap();
    if let Ok(mut playback) = DemoPlayback::open(data, schema, config) {
        for _ in 0..256 {
            match playback.next_frame() {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
    }
});

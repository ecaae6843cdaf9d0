use bitstream::MessageBuffer;
use demo::{DemoConfig, DemoMetadata, DemoPlayback, DemoPlayer, DemoRead, DemoRecorder};
use proptest::prelude::*;
use schema::{FieldKind, Schema};

fn header() -> Vec<u8> {
    DemoRecorder::start(Vec::new(), &DemoMetadata::new(), DemoConfig::for_testing())
        .unwrap()
        .stop()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_player_never_panics(tail in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = header();
        bytes.truncate(bytes.len() - 4);
        bytes.extend_from_slice(&tail);

        let config = DemoConfig::for_testing();
        let mut player = DemoPlayer::open(bytes.as_slice(), &config).unwrap();
        let mut msg = MessageBuffer::new(config.max_message_size);
        for _ in 0..64 {
            match player.read_message(&mut msg) {
                Ok(DemoRead::Message) => prop_assert!(msg.cursize() <= msg.maxsize()),
                Ok(DemoRead::EndOfStream) | Err(_) => break,
            }
        }
    }

    #[test]
    fn prop_open_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..400)) {
        let _ = DemoPlayer::open(bytes.as_slice(), &DemoConfig::for_testing());
    }

    #[test]
    fn prop_playback_never_panics(records in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..64), 0..8,
    )) {
        let config = DemoConfig::for_testing();
        let mut recorder =
            DemoRecorder::start(Vec::new(), &DemoMetadata::new(), config.clone()).unwrap();
        for record in &records {
            let msg = MessageBuffer::from_bytes(record, 64).unwrap();
            recorder.record_message(&msg, 0).unwrap();
        }
        let bytes = recorder.stop().unwrap();

        let schema = Schema::builder("fuzz")
            .field("value", FieldKind::U16)
            .build()
            .unwrap();
        let mut playback = DemoPlayback::open(bytes.as_slice(), schema, config).unwrap();
        for _ in 0..records.len() + 1 {
            match playback.next_frame() {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
    }
}

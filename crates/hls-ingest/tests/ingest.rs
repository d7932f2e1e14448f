use std::sync::Arc;
use std::thread;
use std::time::Duration;

use aac::{AdtsHeader, AudioObjectType, TICKS_PER_SECOND};
use aes::Aes128;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use hls_ingest::{
    CommandKind, IngestConfig, IngestError, PipelineCommand, SegmentIngest, SegmentKey,
};
use pipeline_common::{Command, CommandQueue, init_test_tracing};

const KEY: [u8; 16] = *b"segment-key-0001";

fn adts_segment(frames: usize, payload_length: usize) -> Vec<u8> {
    let header = AdtsHeader::for_payload(AudioObjectType::AacLowComplexity, 48000, 2, payload_length)
        .unwrap()
        .to_bytes()
        .unwrap();

    let mut data = Vec::new();
    for i in 0..frames {
        data.extend_from_slice(&header);
        data.extend((0..payload_length).map(|j| ((i + j) % 251) as u8));
    }
    data
}

fn encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; plaintext.len() + 16];
    buffer[..plaintext.len()].copy_from_slice(plaintext);
    let len = cbc::Encryptor::<Aes128>::new(key.into(), iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buffer, plaintext.len())
        .unwrap()
        .len();
    buffer.truncate(len);
    buffer
}

/// Odd parity on the low 7 bits
fn odd(byte: u8) -> u8 {
    if byte.count_ones() % 2 == 1 { byte } else { byte | 0x80 }
}

fn caption_marker(text: &str) -> String {
    let mut pairs: Vec<(u8, u8)> = text
        .as_bytes()
        .chunks(2)
        .map(|c| (c[0], c.get(1).copied().unwrap_or(0)))
        .collect();
    pairs.push((0x14, 0x2F));
    pairs.push((0x14, 0x2F));

    let mut data = b"GA94\x03".to_vec();
    data.push(0xC0 | pairs.len() as u8);
    data.push(0xFF);
    for (b1, b2) in pairs {
        data.extend_from_slice(&[0xFC, odd(b1), odd(b2)]);
    }
    STANDARD.encode(data)
}

/// Collects commands until a terminal one arrives.
fn consume(queue: &CommandQueue<PipelineCommand>, timeout: Duration) -> Vec<PipelineCommand> {
    let mut received = Vec::new();
    let mut idle = 0;
    loop {
        if !queue.wait_for_item(timeout) {
            idle += 1;
            assert!(idle < 100, "producer never finished");
            continue;
        }
        while let Some(command) = queue.dequeue() {
            let terminal = command.is_terminal();
            received.push(command);
            if terminal {
                return received;
            }
        }
    }
}

#[test]
fn test_encrypted_segments_reach_consumer_in_order() {
    init_test_tracing!();

    let config = IngestConfig::builder()
        .with_blocks_per_fill(4)
        .with_read_chunk_size(100)
        .build();
    let timeout = config.queue.wait_timeout;
    let mut ingest = SegmentIngest::with_config(config);
    let queue = Arc::clone(ingest.queue());

    let producer = thread::spawn(move || {
        for sequence in 0..2u64 {
            let key = SegmentKey::from_playlist(&KEY, None, sequence).unwrap();
            let ciphertext = encrypt(&KEY, key.iv(), &adts_segment(5, 77));
            ingest.push_pts(sequence * 90_000);
            ingest.ingest_segment(&ciphertext[..], Some(&key)).unwrap();
        }
        ingest
            .ingest_caption_marker(2 * TICKS_PER_SECOND, &caption_marker("HELLO"))
            .unwrap();
        ingest.end_of_stream();
        ingest.segments()
    });

    let received = consume(&queue, timeout);
    assert_eq!(producer.join().unwrap(), 2);

    let kinds: Vec<_> = received.iter().map(Command::kind).collect();
    let mut expected = vec![CommandKind::Format];
    expected.extend(std::iter::repeat_n(CommandKind::Sample, 10));
    expected.push(CommandKind::Caption);
    expected.push(CommandKind::Close);
    assert_eq!(kinds, expected);

    let PipelineCommand::Format(format) = &received[0] else {
        unreachable!()
    };
    assert_eq!(format.sampling_rate, 48000);
    assert_eq!(format.channels, 2);

    let timestamps: Vec<u64> = received
        .iter()
        .filter_map(|command| match command {
            PipelineCommand::Sample(frame) => {
                assert_eq!(frame.payload.len(), 77);
                Some(frame.sample.timestamp)
            }
            _ => None,
        })
        .collect();
    let duration = 1024 * TICKS_PER_SECOND / 48000;
    assert_eq!(timestamps[0], 0);
    assert_eq!(timestamps[1], duration);
    assert_eq!(timestamps[5], TICKS_PER_SECOND);
    assert_eq!(timestamps[9], TICKS_PER_SECOND + 4 * duration);

    match &received[11] {
        PipelineCommand::Caption { timestamp, caption } => {
            assert_eq!(*timestamp, 2 * TICKS_PER_SECOND);
            assert_eq!(caption.text(), "HELLO");
        }
        other => panic!("expected a caption, got {other:?}"),
    }
}

#[test]
fn test_truncated_ciphertext_fails_the_stream() {
    let mut ingest = SegmentIngest::new();
    let queue = Arc::clone(ingest.queue());
    let timeout = ingest.config().queue.wait_timeout;

    let producer = thread::spawn(move || {
        let key = SegmentKey::new(KEY, [9u8; 16]);
        let mut ciphertext = encrypt(&KEY, key.iv(), &adts_segment(3, 40));
        ciphertext.extend_from_slice(&[0u8; 5]);

        let error = ingest
            .ingest_segment(&ciphertext[..], Some(&key))
            .unwrap_err();
        assert!(error.is_fatal());
        ingest.fail(error).unwrap();
    });

    let received = consume(&queue, timeout);
    producer.join().unwrap();

    assert_eq!(received.len(), 1);
    match &received[0] {
        PipelineCommand::Error(error) => {
            assert!(matches!(
                error.as_ref(),
                IngestError::Decrypt(hls_crypto::DecryptError::MisalignedFinalBlock(149))
            ));
        }
        other => panic!("expected an error, got {other:?}"),
    }
}

#[test]
fn test_close_preempts_pending_samples() {
    let mut ingest = SegmentIngest::new();
    ingest.ingest_segment(&adts_segment(3, 20)[..], None).unwrap();
    assert_eq!(ingest.queue().len(), 4);

    ingest.close();
    let pending = ingest.queue().drain();
    assert!(matches!(pending.as_slice(), [PipelineCommand::Close]));
    assert!(matches!(
        ingest.ingest_segment(&adts_segment(1, 20)[..], None),
        Err(IngestError::Queue(_))
    ));
}

#[test]
fn test_bad_caption_marker_is_not_fatal() {
    let mut ingest = SegmentIngest::new();

    let error = ingest.ingest_caption_marker(0, "R0E5NA==").unwrap_err();
    assert!(matches!(error, IngestError::Caption(_)));
    assert!(!error.is_fatal());

    assert_eq!(ingest.ingest_caption_marker(0, &caption_marker("OK")).unwrap(), 1);
    assert!(matches!(
        ingest.queue().dequeue(),
        Some(PipelineCommand::Caption { .. })
    ));
}

#[test]
fn test_garbage_between_frames_is_skipped() {
    let mut segment = vec![0x47, 0x00, 0x12];
    segment.extend(adts_segment(4, 60));

    let mut ingest = SegmentIngest::new();
    let stats = ingest.ingest_segment(&segment[..], None).unwrap();
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.discarded, 3);
}

//! Chunk boundaries, progress reporting and the multi-chunk output layout.

use ticket_crypt::{
    Algorithm, CHUNK_SIZE, ChunkedEncryptionPipeline, DecryptionPipeline, PipelineConfig,
    PipelineEvent, TicketCryptError,
};

const MIB: usize = 1024 * 1024;

fn ticket_abc() -> String {
    "abc".repeat(22)[..64].to_string()
}

fn fast() -> PipelineConfig {
    PipelineConfig {
        kdf_iterations: 1_000,
        ..Default::default()
    }
}

fn tiny_chunks() -> PipelineConfig {
    PipelineConfig {
        chunk_size: 64,
        kdf_iterations: 1_000,
    }
}

fn run(
    config: PipelineConfig,
    data: &[u8],
    alg: Algorithm,
) -> (ticket_crypt::EncryptedOutput, Vec<PipelineEvent>) {
    let mut events = Vec::new();
    let out = ChunkedEncryptionPipeline::new(config)
        .unwrap()
        .run(data, alg, &ticket_abc(), |e| events.push(e))
        .unwrap();
    (out, events)
}

fn progress_of(events: &[PipelineEvent]) -> Vec<(f64, usize, usize)> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress(p) => Some((p.progress, p.current_chunk, p.total_chunks)),
            PipelineEvent::Started { .. } => None,
        })
        .collect()
}

#[test]
fn exactly_one_chunk_round_trips() {
    let data = vec![0x5au8; CHUNK_SIZE];
    let (out, events) = run(fast(), &data, Algorithm::AesGcm);
    assert_eq!(out.total_chunks, 1);
    assert_eq!(progress_of(&events), vec![(100.0, 1, 1)]);

    let pt = DecryptionPipeline::new(fast())
        .unwrap()
        .run_raw(&out.ciphertext, &out.iv, &ticket_abc(), Algorithm::AesGcm)
        .unwrap();
    assert_eq!(pt, data);
}

#[test]
fn one_byte_over_starts_a_second_chunk() {
    let data = vec![1u8; CHUNK_SIZE + 1];
    let (out, events) = run(fast(), &data, Algorithm::AesCbc);
    assert_eq!(out.total_chunks, 2);
    let p = progress_of(&events);
    assert_eq!(p.len(), 2);
    assert_eq!(p[0], (50.0, 1, 2));
    assert_eq!(p[1], (100.0, 2, 2));
    // Full chunk pads to an extra block, the one-byte tail pads to one block.
    assert_eq!(out.ciphertext.len(), CHUNK_SIZE + 16 + 16);
}

#[test]
fn three_full_chunks() {
    let data = vec![2u8; 3 * CHUNK_SIZE];
    let (out, events) = run(fast(), &data, Algorithm::AesGcm);
    assert_eq!(out.total_chunks, 3);
    assert_eq!(progress_of(&events).len(), 3);
    assert_eq!(out.ciphertext.len(), 3 * CHUNK_SIZE + 3 * 16);
}

#[test]
fn twenty_five_mib_of_zeros_under_gcm() {
    let data = vec![0u8; 25 * MIB];
    let (out, events) = run(PipelineConfig::default(), &data, Algorithm::AesGcm);

    assert_eq!(out.total_chunks, 3);
    assert_eq!(out.iv.len(), 12);
    assert_eq!(out.ciphertext.len(), 25 * MIB + 3 * 16);

    assert_eq!(
        events.first(),
        Some(&PipelineEvent::Started {
            total_size: 25 * MIB
        })
    );
    let p = progress_of(&events);
    assert_eq!(p.len(), 3);
    assert!((p[0].0 - 100.0 / 3.0).abs() < 1e-9);
    assert!((p[1].0 - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(p[2], (100.0, 3, 3));
}

#[test]
fn progress_is_strictly_increasing_and_ends_at_100() {
    for alg in Algorithm::ALL {
        let data = vec![9u8; 64 * 7 + 3];
        let (out, events) = run(tiny_chunks(), &data, alg);
        assert_eq!(out.total_chunks, 8);

        assert!(matches!(
            events.first(),
            Some(PipelineEvent::Started { total_size }) if *total_size == data.len()
        ));
        let p = progress_of(&events);
        assert_eq!(p.len(), 8);
        for (i, (progress, current, total)) in p.iter().enumerate() {
            assert_eq!(*current, i + 1);
            assert_eq!(*total, 8);
            assert!(*progress > 0.0 && *progress <= 100.0);
        }
        assert!(p.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(p.last().map(|x| x.0), Some(100.0));
    }
}

#[test]
fn empty_input_is_one_chunk() {
    let (out, events) = run(tiny_chunks(), b"", Algorithm::AesGcm);
    assert_eq!(out.total_chunks, 1);
    assert_eq!(progress_of(&events), vec![(100.0, 1, 1)]);
}

// Every chunk is sealed under its own IV but only the first IV is kept, so a
// single decryption pass cannot recover a multi-chunk input.
#[test]
fn multi_chunk_output_does_not_decrypt_to_the_input() {
    let data: Vec<u8> = (0..64 * 3 + 10).map(|i| i as u8).collect();
    let dec = DecryptionPipeline::new(tiny_chunks()).unwrap();

    let (out, _) = run(tiny_chunks(), &data, Algorithm::AesGcm);
    assert_eq!(out.total_chunks, 4);
    assert!(matches!(
        dec.run_raw(&out.ciphertext, &out.iv, &ticket_abc(), Algorithm::AesGcm),
        Err(TicketCryptError::DecryptionFailed)
    ));

    let (out, _) = run(tiny_chunks(), &data, Algorithm::AesCbc);
    match dec.run_raw(&out.ciphertext, &out.iv, &ticket_abc(), Algorithm::AesCbc) {
        Err(TicketCryptError::DecryptionFailed) => {}
        Ok(pt) => {
            assert_ne!(pt, data);
            // The first chunk still comes back intact.
            assert_eq!(&pt[..64], &data[..64]);
        }
        Err(e) => panic!("unexpected error: {e}"),
    }
}

#[test]
fn zero_chunk_size_is_rejected() {
    let res = ChunkedEncryptionPipeline::new(PipelineConfig {
        chunk_size: 0,
        kdf_iterations: 1_000,
    });
    assert!(matches!(res, Err(TicketCryptError::Invalid(_))));
}

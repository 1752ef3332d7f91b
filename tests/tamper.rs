//! Tampering, malformed input and the single-shot path.

use ticket_crypt::{
    Algorithm, ChunkedEncryptionPipeline, DecryptionPipeline, PipelineConfig, Ticket,
    TicketCryptError, b64_encode, decrypt_bytes, encrypt_bytes,
};

const ITER: u32 = 1_000;

fn fast() -> PipelineConfig {
    PipelineConfig {
        kdf_iterations: ITER,
        ..Default::default()
    }
}

/// Flip one byte of a GCM ciphertext and expect an authentication failure.
#[test]
fn tamper_gcm_ciphertext_fails() {
    let t = Ticket::generate().unwrap();
    let mut out = ChunkedEncryptionPipeline::new(fast())
        .unwrap()
        .run(b"message to protect", Algorithm::AesGcm, t.as_str(), |_| {})
        .unwrap();
    out.ciphertext[0] ^= 0x01;
    let res = DecryptionPipeline::new(fast()).unwrap().run_raw(
        &out.ciphertext,
        &out.iv,
        t.as_str(),
        Algorithm::AesGcm,
    );
    assert!(matches!(res, Err(TicketCryptError::DecryptionFailed)));
}

#[test]
fn tamper_gcm_tag_fails() {
    let t = Ticket::generate().unwrap();
    let mut out = ChunkedEncryptionPipeline::new(fast())
        .unwrap()
        .run(b"tag", Algorithm::AesGcm, t.as_str(), |_| {})
        .unwrap();
    if let Some(last) = out.ciphertext.last_mut() {
        *last ^= 0x80;
    }
    let res = DecryptionPipeline::new(fast()).unwrap().run_raw(
        &out.ciphertext,
        &out.iv,
        t.as_str(),
        Algorithm::AesGcm,
    );
    assert!(matches!(res, Err(TicketCryptError::DecryptionFailed)));
}

#[test]
fn truncated_cbc_ciphertext_fails() {
    let t = Ticket::generate().unwrap();
    let out = ChunkedEncryptionPipeline::new(fast())
        .unwrap()
        .run(&[4u8; 40], Algorithm::AesCbc, t.as_str(), |_| {})
        .unwrap();
    let res = DecryptionPipeline::new(fast()).unwrap().run_raw(
        &out.ciphertext[..out.ciphertext.len() - 3],
        &out.iv,
        t.as_str(),
        Algorithm::AesCbc,
    );
    assert!(matches!(res, Err(TicketCryptError::DecryptionFailed)));
}

#[test]
fn wrong_iv_length_fails_generically() {
    let t = Ticket::generate().unwrap();
    let out = ChunkedEncryptionPipeline::new(fast())
        .unwrap()
        .run(b"iv", Algorithm::AesGcm, t.as_str(), |_| {})
        .unwrap();
    let res = DecryptionPipeline::new(fast()).unwrap().run_raw(
        &out.ciphertext,
        &out.iv[..8],
        t.as_str(),
        Algorithm::AesGcm,
    );
    assert!(matches!(res, Err(TicketCryptError::DecryptionFailed)));
}

#[test]
fn non_base64_input_is_malformed() {
    let dec = DecryptionPipeline::new(fast()).unwrap();
    let iv = b64_encode(&[0u8; 12]);
    let res = dec.run("***", &iv, &"0".repeat(64), Algorithm::AesGcm);
    assert!(matches!(res, Err(TicketCryptError::Malformed(_))));
    let res = dec.run(&b64_encode(b"ciphertext"), "%%", &"0".repeat(64), Algorithm::AesGcm);
    assert!(matches!(res, Err(TicketCryptError::Malformed(_))));
}

#[test]
fn single_shot_round_trips_both_algorithms() {
    let t = Ticket::generate().unwrap();
    let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    for alg in Algorithm::ALL {
        let out = encrypt_bytes(&data, alg, t.as_str(), ITER).unwrap();
        assert_eq!(out.total_chunks, 1);
        assert_eq!(out.iv.len(), alg.iv_len());
        let pt = decrypt_bytes(&out.ciphertext, &out.iv, alg, t.as_str(), ITER).unwrap();
        assert_eq!(pt, data);
    }
}

#[test]
fn single_shot_and_chunked_keys_differ() {
    let t = Ticket::generate().unwrap();
    let out = encrypt_bytes(b"not interchangeable", Algorithm::AesGcm, t.as_str(), ITER).unwrap();
    let res = DecryptionPipeline::new(fast()).unwrap().run_raw(
        &out.ciphertext,
        &out.iv,
        t.as_str(),
        Algorithm::AesGcm,
    );
    assert!(matches!(res, Err(TicketCryptError::DecryptionFailed)));
}

#[test]
fn single_shot_wrong_ticket_fails() {
    let out = encrypt_bytes(b"secret", Algorithm::AesGcm, &"a".repeat(64), ITER).unwrap();
    let res = decrypt_bytes(
        &out.ciphertext,
        &out.iv,
        Algorithm::AesGcm,
        &"b".repeat(64),
        ITER,
    );
    assert!(matches!(res, Err(TicketCryptError::DecryptionFailed)));
}

#[test]
fn empty_ticket_is_refused() {
    assert!(matches!(
        encrypt_bytes(b"x", Algorithm::AesCbc, "", ITER),
        Err(TicketCryptError::Invalid(_))
    ));
}

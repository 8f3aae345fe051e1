//! Slack request signing (`X-Slack-Signature`, version `v0`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Requests older (or newer) than this are rejected as replays.
pub const MAX_REQUEST_AGE_SECS: u64 = 300;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing or malformed request timestamp")]
    BadTimestamp,
    #[error("request timestamp outside the replay window")]
    Stale,
    #[error("signature does not match")]
    Mismatch,
}

/// Verify a Slack request signature against the raw body.
pub fn verify(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::BadTimestamp)?;
    // The header is client-controlled; extreme values must not overflow.
    let age = now_unix
        .checked_sub(ts)
        .map(i64::unsigned_abs)
        .ok_or(SignatureError::Stale)?;
    if age > MAX_REQUEST_AGE_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(SignatureError::Mismatch)?;

    let mac = signer(signing_secret, timestamp, body);
    mac.verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Compute the `v0=` signature for a request.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mac = signer(signing_secret, timestamp, body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

fn signer(signing_secret: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    // HMAC pads or hashes the key to the block size, so no length is rejected.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example from Slack's "Verifying requests" documentation.
    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const TS: &str = "1531420618";
    const BODY: &str = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
    const SIG: &str = "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

    #[test]
    fn accepts_documented_example() {
        assert_eq!(sign(SECRET, TS, BODY.as_bytes()), SIG);
        assert_eq!(verify(SECRET, TS, BODY.as_bytes(), SIG, 1531420618 + 10), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let err = verify(SECRET, TS, b"token=other", SIG, 1531420618).unwrap_err();
        assert_eq!(err, SignatureError::Mismatch);
    }

    #[test]
    fn rejects_stale_request() {
        let err = verify(SECRET, TS, BODY.as_bytes(), SIG, 1531420618 + 301).unwrap_err();
        assert_eq!(err, SignatureError::Stale);
    }

    #[test]
    fn extreme_timestamps_are_stale_not_overflow() {
        for ts in [i64::MIN.to_string(), i64::MAX.to_string()] {
            assert_eq!(
                verify(SECRET, &ts, b"{}", "v0=00", 1_700_000_000),
                Err(SignatureError::Stale)
            );
        }
        assert_eq!(
            verify(SECRET, "0", b"{}", "v0=00", i64::MIN),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn rejects_garbage_headers() {
        assert_eq!(
            verify(SECRET, "", BODY.as_bytes(), SIG, 0),
            Err(SignatureError::BadTimestamp)
        );
        assert_eq!(
            verify(SECRET, TS, BODY.as_bytes(), "sha256=zz", 1531420618),
            Err(SignatureError::Mismatch)
        );
    }
}

//! One-time passcode generation and the mail payload that carries it.

use anyhow::{Context, Result};
use base64::Engine;
use rand::{rngs::OsRng, Rng, RngCore};

pub const OTP_MAIL_SUBJECT: &str = "OTP Verification";

/// Generate a 4-digit numeric OTP (1000..=9999, no leading zeros).
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

/// Body of the OTP mail; the raw code is only ever sent to the user, the
/// database keeps a bcrypt hash.
pub fn otp_message(otp: &str) -> String {
    format!("Your OTP is: {otp}")
}

/// Create the placeholder secret stored while a refresh-token row waits to be
/// finalized with the hash of its signed token. The raw value is discarded,
/// so the row stays unreachable until finalized.
pub fn generate_placeholder_secret() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate placeholder secret")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::{generate_otp, generate_placeholder_secret, otp_message};
    use anyhow::Result;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    #[test]
    fn otp_is_four_digits_in_range() {
        for _ in 0..256 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 4);
            let value: u32 = otp.parse().expect("numeric otp");
            assert!((1000..=9999).contains(&value));
        }
    }

    #[test]
    fn otp_message_embeds_code() {
        assert_eq!(otp_message("1234"), "Your OTP is: 1234");
    }

    #[test]
    fn placeholder_secret_is_32_random_bytes() -> Result<()> {
        let first = generate_placeholder_secret()?;
        let second = generate_placeholder_secret()?;
        assert_ne!(first, second);
        assert_eq!(URL_SAFE_NO_PAD.decode(first.as_bytes())?.len(), 32);
        Ok(())
    }
}

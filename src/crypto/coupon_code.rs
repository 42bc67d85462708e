use hmac::{Hmac, Mac};

use secrecy::{ExposeSecret, Secret};

use sha2::Sha256;

/// Number of hex characters of the digest kept in a coupon code
const CODE_HEX_LEN: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CouponCodeError {
    #[error("Coupon signing secret is not configured")]
    MissingSecret,
    #[error("Failed to initialize coupon signing key")]
    InvalidKey(#[from] hmac::digest::InvalidLength),
}

/// Server-held secret that coupon codes are derived from
#[derive(Clone)]
pub struct CouponSecret(Option<Secret<String>>);

impl CouponSecret {
    /// Wrap a configured secret; blank secrets count as unset
    pub fn new(secret: Option<Secret<String>>) -> Self {
        let secret = secret.filter(|s| !s.expose_secret().trim().is_empty());
        Self(secret)
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    /// Derive the coupon code for an email and campaign
    pub fn derive(
        &self,
        email: &str,
        campaign_id: &str,
        prefix: &str,
    ) -> Result<String, CouponCodeError> {
        let secret = self.0.as_ref().ok_or(CouponCodeError::MissingSecret)?;
        derive_code(secret, email, campaign_id, prefix)
    }
}

impl std::fmt::Debug for CouponSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CouponSecret")
            .field(&self.0.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `{prefix}-{first 10 hex chars of HMAC-SHA256(secret, "{email}|{campaign_id}"), uppercased}`
pub fn derive_code(
    secret: &Secret<String>,
    email: &str,
    campaign_id: &str,
    prefix: &str,
) -> Result<String, CouponCodeError> {
    let secret = secret.expose_secret();
    if secret.is_empty() {
        return Err(CouponCodeError::MissingSecret);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())?;
    mac.update(format!("{}|{}", email, campaign_id).as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "{}-{}",
        prefix,
        digest[..CODE_HEX_LEN].to_uppercase()
    ))
}

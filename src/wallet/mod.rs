// Wallet identities and key management

mod encryption;
mod keypair;
mod keystore;

pub use encryption::{
    KdfParams, MIN_PASSWORD_LEN, decrypt_private_key, encrypt_private_key, validate_password,
};
pub use keypair::KeyPair;
pub use keystore::Wallet;

#[cfg(test)]
pub(crate) use encryption::test_params;

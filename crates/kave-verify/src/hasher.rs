use sha3::Digest as _;

pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

pub struct Sha3_512Hasher(sha3::Sha3_512);

impl Hasher for Sha3_512Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Default for Sha3_512Hasher {
    fn default() -> Self { Self::new() }
}

impl Sha3_512Hasher {
    pub fn new() -> Self { Self(sha3::Sha3_512::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { sha3::Sha3_512::digest(data).to_vec() }
}

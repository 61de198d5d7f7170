use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

pub const DEFAULT_SEED: u64 = 42;

/// Seed selection for a play session. Everything random in the core is drawn
/// from an rng built from these params, so a fixed seed replays a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationParams {
    pub seed: u64,
}

impl SimulationParams {
    pub fn from_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self { seed: DEFAULT_SEED }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationRng {
    seed: u64,
    rng: StdRng,
}

impl SimulationRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_params(params: &SimulationParams) -> Self {
        Self::new(params.seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for SimulationRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// UUID v4 built from the injected rng rather than the OS entropy pool.
pub fn fresh_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

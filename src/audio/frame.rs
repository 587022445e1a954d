// The smallest unit of audio on the output side; one stereo frame.
// Voices and the first half of each chain are mono, the reverb widens to this.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn mono(v: f32) -> Self {
        Self { left: v, right: v }
    }

    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}

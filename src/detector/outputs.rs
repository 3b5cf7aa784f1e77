use ndarray::ArrayD;

/// Named tensors produced by one inference call.
///
/// Lifetime is one frame iteration: the engine fills it, the decoder consumes
/// it, nothing outlives the frame. All tensors are widened to f32 on
/// extraction so the decoder stays dtype-agnostic.
#[derive(Debug, Default, Clone)]
pub struct RawOutputs {
    names: Vec<String>,
    tensors: Vec<ArrayD<f32>>,
}

impl RawOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, tensor: ArrayD<f32>) {
        self.names.push(name.to_string());
        self.tensors.push(tensor);
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.tensors[i])
    }

    pub fn by_index(&self, index: usize) -> Option<&ArrayD<f32>> {
        self.tensors.get(index)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

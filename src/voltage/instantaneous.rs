// voltage/instantaneous.rs
// Sections switch fully on the moment the synchronous particle reaches them

use super::{SchemeParams, SyncState};

#[derive(Clone, Debug)]
pub struct InstantaneousScheme {
    params: SchemeParams,
    /// Next section to switch on (1-based). Section 1 is on from the start.
    section: usize,
    voltages: Vec<f32>,
}

impl InstantaneousScheme {
    pub fn new(params: SchemeParams) -> Self {
        Self {
            params,
            section: 2,
            voltages: vec![0.0; params.n_electrodes],
        }
    }

    pub fn section(&self) -> usize {
        self.section
    }

    pub fn initial_voltages(&mut self) -> &[f32] {
        self.voltages = self.params.first_section_on();
        &self.voltages
    }

    pub fn is_active(&self, sync: Option<SyncState>) -> bool {
        match sync {
            Some(s) => {
                self.section < self.params.n_sections()
                    && s.z >= self.section as f32 * self.params.section_width
            }
            None => false,
        }
    }

    pub fn voltages(&mut self) -> &[f32] {
        if self.section < self.params.n_sections() {
            let range = self.params.section_electrodes(self.section);
            for v in &mut self.voltages[range.clone()] {
                *v = self.params.max_voltage;
            }
            log::debug!("Section {} on (electrodes {}..{})", self.section, range.start + 1, range.end);
            self.section += 1;
        }
        &self.voltages
    }
}

//! Derived-lead synthesis from the two captured limb leads
//!
//! The four remaining limb leads are fixed linear combinations of leads I
//! and II, applied element-wise after conditioning. aVF doubles as the
//! vertical projection for frontal-plane axis computation.

use ecg_core::{LeadId, LeadSet};

/// The derived limb-lead series for one capture.
#[derive(Debug, Clone)]
pub struct DerivedLeads {
    pub iii: Vec<f64>,
    pub avr: Vec<f64>,
    pub avl: Vec<f64>,
    pub avf: Vec<f64>,
}

/// Compute III, aVR, aVL and aVF from leads I and II.
///
/// The inputs are truncated to the shorter of the two before combining.
pub fn derive_leads(lead_i: &[f64], lead_ii: &[f64]) -> DerivedLeads {
    let len = lead_i.len().min(lead_ii.len());
    let i = &lead_i[..len];
    let ii = &lead_ii[..len];

    let mut derived = DerivedLeads {
        iii: Vec::with_capacity(len),
        avr: Vec::with_capacity(len),
        avl: Vec::with_capacity(len),
        avf: Vec::with_capacity(len),
    };

    for k in 0..len {
        derived.iii.push(ii[k] - i[k]);
        derived.avr.push(-(i[k] + ii[k]) / 2.0);
        derived.avl.push(i[k] - ii[k] / 2.0);
        derived.avf.push(ii[k] - i[k] / 2.0);
    }
    derived
}

/// Derive and attach all four leads onto a lead set.
pub fn attach_derived_leads(leads: &mut LeadSet) {
    let (lead_i, lead_ii) = match (leads.series(LeadId::I), leads.series(LeadId::II)) {
        (Some(a), Some(b)) => (a.to_vec(), b.to_vec()),
        _ => return,
    };
    let derived = derive_leads(&lead_i, &lead_ii);
    leads.attach_derived(LeadId::III, derived.iii);
    leads.attach_derived(LeadId::AVR, derived.avr);
    leads.attach_derived(LeadId::AVL, derived.avl);
    leads.attach_derived(LeadId::AVF, derived.avf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_combinations() {
        let lead_i = vec![2.0, 4.0];
        let lead_ii = vec![6.0, 8.0];
        let d = derive_leads(&lead_i, &lead_ii);

        assert_eq!(d.iii, vec![4.0, 4.0]);
        assert_eq!(d.avr, vec![-4.0, -6.0]);
        assert_eq!(d.avl, vec![-1.0, 0.0]);
        assert_eq!(d.avf, vec![5.0, 6.0]);
    }

    #[test]
    fn test_unequal_lengths_truncate() {
        let d = derive_leads(&[1.0, 2.0, 3.0], &[1.0]);
        assert_eq!(d.iii.len(), 1);
    }

    #[test]
    fn test_attach_to_lead_set() {
        let mut leads = LeadSet::new(500.0);
        for v in 0..4 {
            leads.push_sample(0, v as f64);
            leads.push_sample(1, (2 * v) as f64);
        }
        attach_derived_leads(&mut leads);

        let iii = leads.series(LeadId::III).unwrap();
        assert_eq!(iii, &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(leads.all_series().len(), 12);
    }
}

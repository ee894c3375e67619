#![no_main]

use libfuzzer_sys::fuzz_target;
use xspec_core::TestKind;
use xspec_runner::pipeline::{PendingPolicies, SpecFilter};
use xspec_runner::xml::{Recorder, Source, XmlReader};

fuzz_target!(|data: &[u8]| {
    for policies in [PendingPolicies::default(), PendingPolicies::eliding(&[TestKind::Xslt])] {
        let mut filter = SpecFilter::new(XmlReader::new(data), policies);
        let mut recorder = Recorder::new();
        if filter.pump(&mut recorder).is_ok() {
            // A fully filtered document always has a count, and never elides more than is pending.
            let count = filter.count().unwrap();
            assert!(count.elided <= count.pending);
            assert!(count.pending <= count.declared);
        }
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(mol) = corescope_chem::parse_smiles(data) {
        let _ = corescope_chem::canonical_smiles(&mol);
    }
});

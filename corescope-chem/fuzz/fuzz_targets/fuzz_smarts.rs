#![no_main]
use libfuzzer_sys::fuzz_target;

use corescope_chem::{NativeToolkit, PatternSource, SubstitutionDefs, Toolkit};

fuzz_target!(|data: &str| {
    let mut defs = SubstitutionDefs::new();
    defs.insert("hal", "[F,Cl,Br,I]");
    let source = PatternSource::Smarts(data.to_string());
    if let Ok(pattern) = NativeToolkit.compile_pattern("fuzz", &source, &defs) {
        if let Ok(mol) = corescope_chem::parse_smiles("CC(=O)Nc1ccc(Cl)cc1") {
            let _ = pattern.first_match(&mol);
        }
    }
});

use rime::{codegen::CodeGenerator, hash::Elsa, random::Lcg, UnorderedMap, UnorderedSet};
use std::path::PathBuf;

const C_KEYWORDS: [&str; 32] = [
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

fn main() {
    println!("cargo::rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let write = |name: &str, code: String| {
        std::fs::write(out_dir.join(name), code).expect("Failed to write code");
    };

    let keywords = UnorderedSet::try_from_elements_with(
        C_KEYWORDS,
        Elsa::new(),
        &mut Lcg::default(),
        Some(64),
    )
    .expect("keywords are distinct");
    write("keywords.rs", CodeGenerator::new().generate(&keywords).to_string());

    let tokens = UnorderedMap::from_entries(C_KEYWORDS.into_iter().zip(0u32..32));
    write("tokens.rs", CodeGenerator::new().generate(&tokens).to_string());

    let squares =
        UnorderedMap::from_entries((0u32..2000).map(|x| (u64::from(x), u64::from(x * x))));
    write("squares.rs", CodeGenerator::new().generate(&squares).to_string());

    let mut gen = CodeGenerator::new();
    gen.set_mutability(true);
    write("tokens_mut.rs", gen.generate(&tokens).to_string());
}

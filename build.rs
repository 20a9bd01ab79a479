fn main() {
    let mut key_size: Option<String> = None;

    for (name, _) in std::env::vars() {
        let prefix = "CARGO_FEATURE_RSA_";
        if let Some(suffix) = name.strip_prefix(prefix) {
            // The exponent selection is independent of the key size.
            if suffix.starts_with("EXPONENT") {
                continue;
            }
            if let Some(previous) = &key_size {
                panic!(
                    "multiple key size features defined (at least {} and {})",
                    show_feature(previous),
                    show_feature(suffix)
                );
            }

            key_size = Some(suffix.to_string());
        }
    }
}

fn show_feature(envvar: &str) -> String {
    let mut name = "rsa-".to_string();
    name.push_str(&envvar.to_ascii_lowercase().replace('_', "-"));
    name
}

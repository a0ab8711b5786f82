/// A language the provider can auto-generate captions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "es", name: "Spanish" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "de", name: "German" },
    Language { code: "fr", name: "French" },
    Language { code: "pl", name: "Polish" },
    Language { code: "ru", name: "Russian" },
    Language { code: "nl", name: "Dutch" },
    Language { code: "ca", name: "Catalan" },
    Language { code: "tr", name: "Turkish" },
    Language { code: "sv", name: "Swedish" },
    Language { code: "uk", name: "Ukrainian" },
    Language { code: "no", name: "Norwegian" },
    Language { code: "fi", name: "Finnish" },
    Language { code: "sk", name: "Slovak" },
    Language { code: "el", name: "Greek" },
    Language { code: "cs", name: "Czech" },
    Language { code: "hr", name: "Croatian" },
    Language { code: "da", name: "Danish" },
    Language { code: "ro", name: "Romanian" },
    Language { code: "bg", name: "Bulgarian" },
];

pub fn find_language(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code == code)
}

use clap::ValueEnum;

/// Source map generation mode
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum SourcemapArg {
    /// Separate `.map` files next to each chunk
    #[value(name = "file")]
    File,

    /// Base64 data URL appended to each chunk
    #[value(name = "inline")]
    Inline,

    /// `.map` files without a `sourceMappingURL` comment
    #[value(name = "hidden")]
    Hidden,
}

impl SourcemapArg {
    /// Value of the `sourcemap` build option.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Inline => "inline",
            Self::Hidden => "hidden",
        }
    }
}

/// Deployment tool constants
pub mod tool {
    /// Serverless Framework CLI binary name
    pub const SLS: &str = "sls";

    /// Name of the service descriptor inside the descriptor directory
    pub const DESCRIPTOR_FILE: &str = "serverless.yml";

    /// Placeholder substituted with the run suffix
    pub const SUFFIX_PLACEHOLDER: &str = "${opt:suffix}";

    /// Flag carrying the run suffix on every tool invocation
    pub const SUFFIX_FLAG: &str = "--suffix";
}

/// Retry constants for deployment tool invocations
pub mod retry {
    /// Total number of attempts per invocation
    pub const MAX_ATTEMPTS: u32 = 10;

    /// Fixed delay between attempts, in seconds
    pub const DELAY_SECS: u64 = 5;
}

/// Runtime source directory names under the descriptor directory
pub mod runtime {
    pub const JAVA8: &str = "java8";
    pub const JAVA11: &str = "java11";
    pub const CSHARP: &str = "csharp";
    pub const GOLANG: &str = "golang";
}

/// Provider constants
pub mod provider {
    /// Provider expected when none is configured
    pub const DEFAULT: &str = "aws";
}

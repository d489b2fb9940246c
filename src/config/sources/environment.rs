//! Environment source: EBX_SECTION__KEY variables, e.g. EBX_CONNECTION__PASSWORD.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("EBX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

use crate::entry::ServiceContext;
use crate::env;
use crate::error::Result;
use crate::layer::StackdriverLayer;
use crate::logger::Clock;
use crate::severity::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global `tracing` subscriber.
///
/// **Fields**
/// - `level`: minimum level passed on to the layer. NOTICE behaves like
///   INFO and levels above ERROR like ERROR, since `tracing` has no
///   equivalents.
/// - `service_context`: attached to error records; derived from the
///   environment when `None`.
/// - `source_location`: write `logging.googleapis.com/sourceLocation` from
///   event metadata.
/// - `clock`: timestamp source.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub level: LevelFilter,
    pub service_context: Option<ServiceContext>,
    pub source_location: bool,
    pub clock: Clock,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::default(),
            service_context: None,
            source_location: false,
            clock: Clock::System,
        }
    }
}

impl LayerConfig {
    /// Defaults with the level taken from `LOG_LEVEL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            level: env::level_from_env()?,
            ..Self::default()
        })
    }
}

/// Install a [`Registry`] with a [`StackdriverLayer`] writing to stdout as
/// the global default subscriber.
///
/// **Errors**
/// - `Error::ServiceContext` when no service context is configured and none
///   can be derived from the environment.
/// - `Error::SetGlobalDefault` when a global subscriber is already set.
pub fn init_tracing_with_config(config: LayerConfig) -> Result<()> {
    let service_context = match config.service_context {
        Some(ctx) => ctx,
        None => env::default_service_context(None)?,
    };

    let layer = StackdriverLayer::new(Some(service_context))
        .with_clock(config.clock)
        .with_source_location(config.source_location);

    let subscriber = Registry::default()
        .with(config.level.to_tracing())
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing from the environment.
///
/// Equivalent to [`init_tracing_with_config`] with
/// [`LayerConfig::from_env`]. This is the recommended entrypoint for
/// typical services.
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(LayerConfig::from_env()?)
}

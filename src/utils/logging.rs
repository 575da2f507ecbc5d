//! Inicialização de logging estruturado

use tracing_subscriber::EnvFilter;

/// Inicializa o subscriber global de tracing
///
/// O nível é controlado por `RUST_LOG` (padrão: `info`). Chamadas
/// repetidas são ignoradas, o que permite usar em testes.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

// ============================================================================
// PIXELFX: CPU raster-editing engine
// ============================================================================
//
// Architecture:
//   params.rs    - flat slider record plus the 8-band HSL mixer
//   ops/         - per-buffer transform passes (convolution, tone, threshold)
//   selection.rs - selection state machine, flood fill, mask morphology
//   preview.rs   - resolution-adaptive scaling for large buffers
//   history.rs   - snapshot log with undo/redo cursor and pruning
//   session.rs   - per-image edit session tying the pieces together
//   io.rs        - decode/encode boundary and the engine error type
//
// The engine is deliberately stateless below the session level: every pass
// takes a buffer and parameters and produces pixels, nothing else. All
// shared-buffer parallelism happens inside the passes via rayon.

pub mod history;
pub mod io;
pub mod ops;
pub mod params;
pub mod preview;
pub mod selection;
pub mod session;

pub use history::{HistoryEntry, HistoryLog};
pub use io::{EngineError, ExportFormat, decode_image, encode_image, load_image, save_image};
pub use ops::convolve::Kernel;
pub use params::{EffectParams, HslMixer, HslShift, HueBand};
pub use preview::{PreviewScaler, RenderIntent};
pub use selection::{SelectionEngine, SelectionPhase, SelectionTool};
pub use session::EditSession;

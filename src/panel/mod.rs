//! State container for the Google Drive integration panel.
//!
//! A reducer over a tagged action enum, a per-session store that broadcasts
//! every transition to its subscribers, and an explicit provider registry in
//! place of ambient context lookup.

mod actions;
mod reducer;
mod state;
mod store;

pub use actions::PanelAction;
pub use reducer::reduce;
pub use state::{IndexStats, PanelState};
pub use store::{PanelError, PanelRegistry, PanelStore};

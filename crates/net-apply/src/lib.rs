//! Fabric Network Apply
//!
//! The single global action queue and the worker that applies queued
//! networking actions to switch ports, plus the inventory the worker reads
//! from and commits attachments to.

pub mod applier;
pub mod inventory;
pub mod journal;
pub mod queue;


pub use applier::{transition_for, NetworkApplier, WorkerHandle};
pub use inventory::{Inventory, MemoryInventory};
pub use journal::{ActionJournal, JournalEntry};
pub use queue::{ActionQueue, CANCELLED_DETAIL};

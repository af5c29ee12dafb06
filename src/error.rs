use crate::strategy::StrategyKind;

/// Errors raised by stores, strategies and sync surfaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A strategy of this kind is already registered on the store.
    #[error("a {kind} strategy is already registered on this store")]
    DuplicateStrategy { kind: StrategyKind },

    /// A sync operation ran before any target was bound.
    #[error("no sync target is bound")]
    UnboundTarget,
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

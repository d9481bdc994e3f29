use std::{collections::BTreeMap, fmt, ops::Deref};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    error::CustodyError,
    primitives::{ensure_role, CallContext, Role},
    strategy::StrategyKind,
};

/// The kind of component an implementation can sit behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentKind {
    /// Deposit manager logic.
    DepositManager,
    /// Staking manager logic.
    StakingManager,
    /// Strategy logic for one venue kind.
    Strategy(StrategyKind),
}

/// Deployed executable behavior a proxy can point to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Where the implementation is deployed.
    pub address: Address,
    /// Which component it implements.
    pub kind: ComponentKind,
    /// Reinitializer version: its initializer runs only over storage initialized by an older one.
    pub version: u8,
    /// Storage layout revision. Layouts only ever append fields.
    pub layout: u16,
}

/// Errors raised while swapping implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeError {
    /// Nothing is deployed at the address.
    #[error("no implementation deployed at {0}")]
    UnknownImplementation(Address),
    /// The implementation targets another component.
    #[error("implementation {implementation} is a {found:?}, proxy expects a different component")]
    ComponentMismatch {
        /// The implementation address.
        implementation: Address,
        /// What it implements.
        found: ComponentKind,
    },
    /// The implementation would drop appended storage fields.
    #[error("implementation layout {found} is older than storage layout {current}")]
    IncompatibleLayout {
        /// Layout in use.
        current: u16,
        /// Layout of the rejected implementation.
        found: u16,
    },
    /// The initializer of this version already ran.
    #[error("already initialized at version {initialized}, cannot run version {version}")]
    AlreadyInitialized {
        /// Last initialized version.
        initialized: u8,
        /// Version of the rejected initializer.
        version: u8,
    },
    /// The init payload is for another component.
    #[error("init payload does not match the {0} proxy")]
    PayloadMismatch(&'static str),
}

/// Registry of deployed implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImplementationRegistry {
    implementations: BTreeMap<Address, Implementation>,
}

impl ImplementationRegistry {
    /// Record a deployed implementation.
    pub fn register(&mut self, implementation: Implementation) {
        self.implementations.insert(implementation.address, implementation);
    }

    /// Look up an implementation.
    pub fn get(&self, address: Address) -> Result<&Implementation, UpgradeError> {
        self.implementations.get(&address).ok_or(UpgradeError::UnknownImplementation(address))
    }

    /// The newest implementation of `kind`, if any.
    pub fn latest(&self, kind: ComponentKind) -> Option<&Implementation> {
        self.implementations.values().filter(|i| i.kind == kind).max_by_key(|i| i.version)
    }

    /// Number of deployed implementations.
    pub fn len(&self) -> usize {
        self.implementations.len()
    }

    /// Whether no implementation is deployed.
    pub fn is_empty(&self) -> bool {
        self.implementations.is_empty()
    }
}

/// Initializer bookkeeping kept inside every component's storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVersions {
    /// Last initializer version that ran.
    pub initialized: u8,
    /// Storage layout revision in use.
    pub layout: u16,
}

impl StorageVersions {
    /// Marks `version` as initialized. Each version initializes at most once, in increasing order.
    pub fn reinitialize(&mut self, version: u8) -> Result<(), UpgradeError> {
        if version <= self.initialized {
            return Err(UpgradeError::AlreadyInitialized { initialized: self.initialized, version });
        }

        self.initialized = version;
        Ok(())
    }
}

/// Storage of a component that lives behind a [Proxy].
pub trait Upgradeable: Clone + fmt::Debug + PartialEq + Serialize {
    /// Arguments of the component's initializer.
    type Init: Clone + fmt::Debug + PartialEq + Serialize;

    /// Component name, used in logs and errors.
    const NAME: &'static str;

    /// Whether an implementation of `kind` can run over this storage.
    fn accepts(&self, kind: ComponentKind) -> bool;

    /// The owner principal.
    fn owner(&self) -> Address;

    /// Initializer bookkeeping.
    fn versions(&self) -> &StorageVersions;

    /// Mutable initializer bookkeeping.
    fn versions_mut(&mut self) -> &mut StorageVersions;

    /// Runs the initializer. `this` is the proxy address.
    fn initialize(
        &mut self,
        ctx: &CallContext,
        this: Address,
        init: Self::Init,
    ) -> Result<(), CustodyError>;

    /// Pure migration from one implementation's storage view to the next one's.
    fn migrate(&mut self, _from: &Implementation, _to: &Implementation) {}
}

/// One implementation change, kept in the proxy's upgrade log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeRecord<I> {
    /// Previous implementation.
    pub from: Address,
    /// New implementation.
    pub to: Address,
    /// Initializer invoked in the same step, if any.
    pub init: Option<I>,
}

/// A stable storage container delegating to a swappable implementation.
///
/// The upgrade log lives next to the storage, not in it: swapping implementations back and forth
/// leaves the storage untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound = "")]
pub struct Proxy<S: Upgradeable> {
    address: Address,
    implementation: Address,
    storage: S,
    history: Vec<UpgradeRecord<S::Init>>,
}

impl<S: Upgradeable> Proxy<S> {
    /// Deploys a proxy at `address` pointing to `implementation`, running the initializer.
    pub fn deploy(
        ctx: &CallContext,
        address: Address,
        implementation: &Implementation,
        mut storage: S,
        init: S::Init,
    ) -> Result<Self, CustodyError> {
        if !storage.accepts(implementation.kind) {
            return Err(UpgradeError::ComponentMismatch {
                implementation: implementation.address,
                found: implementation.kind,
            }
            .into());
        }

        storage.versions_mut().layout = implementation.layout;
        storage.versions_mut().reinitialize(implementation.version)?;
        storage.initialize(ctx, address, init)?;

        debug!(component = S::NAME, %address, implementation = %implementation.address, "Proxy deployed");

        Ok(Self { address, implementation: implementation.address, storage, history: Vec::new() })
    }

    /// Swaps the implementation and optionally runs `init` against it, atomically.
    ///
    /// Owner-only. On any failure the proxy is left exactly as it was.
    pub fn upgrade_to_and_call(
        &mut self,
        ctx: &CallContext,
        registry: &ImplementationRegistry,
        implementation: Address,
        init: Option<S::Init>,
    ) -> Result<UpgradeRecord<S::Init>, CustodyError> {
        ensure_role(Role::Owner, self.storage.owner(), ctx.caller)?;

        let from = *registry.get(self.implementation)?;
        let to = *registry.get(implementation)?;

        if !self.storage.accepts(to.kind) {
            return Err(UpgradeError::ComponentMismatch { implementation, found: to.kind }.into());
        }

        let current = self.storage.versions().layout;
        if to.layout < current {
            return Err(UpgradeError::IncompatibleLayout { current, found: to.layout }.into());
        }

        let mut staged = self.storage.clone();
        staged.migrate(&from, &to);
        staged.versions_mut().layout = to.layout;

        if let Some(init) = init.clone() {
            staged.versions_mut().reinitialize(to.version)?;
            staged.initialize(ctx, self.address, init)?;
        }

        let record = UpgradeRecord { from: from.address, to: to.address, init };

        self.storage = staged;
        self.implementation = to.address;
        self.history.push(record.clone());

        debug!(component = S::NAME, from = %record.from, to = %record.to, "Proxy upgraded");

        Ok(record)
    }

    /// The proxy address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The current implementation address.
    pub fn implementation(&self) -> Address {
        self.implementation
    }

    /// Upgrades applied so far, oldest first.
    pub fn history(&self) -> &[UpgradeRecord<S::Init>] {
        &self.history
    }

    /// The persistent storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}

impl<S: Upgradeable> Deref for Proxy<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

/*!

Version-gated manager selection.

A manager type is a "base". Variants of a base are registered with the lowest cluster version they
support (`support_to`). For a given cluster version, the variant with the greatest `support_to`
that does not exceed the cluster version is selected; when none qualifies the base is used.

!*/

use crate::clients::SessionHandle;
use crate::error::{self, Result};
use crate::ClusterVersion;
use log::debug;
use snafu::{ensure, OptionExt};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// The name reported for a manager built from its base rather than from a registered variant.
pub const BASE_VARIANT: &str = "base";

/// A base manager: something that can be resolved through a `ManagerRegistry`.
pub trait Manager: Sized + 'static {
    /// The kind of resource managed, used in logs and errors.
    const KIND: &'static str;

    /// Construct the base implementation, used when no registered variant qualifies.
    fn base(session: SessionHandle) -> Self;
}

/// Builds a manager for a session.
pub type Constructor<M> = fn(SessionHandle) -> M;

/// One registered implementation of base manager `M`.
pub struct Variant<M> {
    name: &'static str,
    support_to: ClusterVersion,
    build: Constructor<M>,
}

impl<M> Variant<M> {
    pub fn new(name: &'static str, support_to: ClusterVersion, build: Constructor<M>) -> Self {
        Self {
            name,
            support_to,
            build,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The lowest cluster version this variant is designed for.
    pub fn support_to(&self) -> &ClusterVersion {
        &self.support_to
    }

    pub fn build(&self, session: SessionHandle) -> M {
        (self.build)(session)
    }
}

// Not derived: that would require `M: Clone`.
impl<M> Clone for Variant<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            support_to: self.support_to.clone(),
            build: self.build,
        }
    }
}

impl<M> std::fmt::Debug for Variant<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("support_to", &self.support_to)
            .finish()
    }
}

/// Select, among `variants`, the one with the greatest `support_to` that is `<= target`. `None`
/// means the base should be used.
///
/// Candidates are ordered at every call; nothing about the table is cached.
pub fn resolve<'a, M>(variants: &'a [Variant<M>], target: &ClusterVersion) -> Option<&'a Variant<M>> {
    let mut candidates: Vec<&Variant<M>> = variants.iter().collect();
    candidates.sort_by(|a, b| b.support_to.cmp(&a.support_to));
    candidates
        .into_iter()
        .find(|variant| variant.support_to <= *target)
}

/// The registration table: for each base manager type, the variants registered against it.
#[derive(Default)]
pub struct ManagerRegistry {
    tables: HashMap<TypeId, Box<dyn Any>>,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variant of base `M`. Two variants of the same base may not share a
    /// `support_to`, since there would be no meaningful way to choose between them.
    pub fn register<M>(
        &mut self,
        name: &'static str,
        support_to: &str,
        build: Constructor<M>,
    ) -> Result<()>
    where
        M: Manager,
    {
        let support_to = ClusterVersion::parse(support_to)?;
        let table = self
            .tables
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Box::new(Vec::<Variant<M>>::new()));
        let variants = table
            .downcast_mut::<Vec<Variant<M>>>()
            .context(error::RegistryTableSnafu { manager: M::KIND })?;
        ensure!(
            variants.iter().all(|v| v.support_to != support_to),
            error::DuplicateVariantSnafu {
                manager: M::KIND,
                support_to: support_to.to_string(),
            }
        );
        debug!(
            "registered {} variant '{}' for {} and later",
            M::KIND,
            name,
            support_to
        );
        variants.push(Variant::new(name, support_to, build));
        Ok(())
    }

    /// The variants registered for base `M`, in registration order.
    pub fn variants<M>(&self) -> &[Variant<M>]
    where
        M: Manager,
    {
        self.tables
            .get(&TypeId::of::<M>())
            .and_then(|table| table.downcast_ref::<Vec<Variant<M>>>())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The variant of `M` to use for `target`, or `None` for the base.
    pub fn resolve<M>(&self, target: &ClusterVersion) -> Option<&Variant<M>>
    where
        M: Manager,
    {
        resolve(self.variants::<M>(), target)
    }

    /// Build the right implementation of `M` for `target`, returning it with the name of the
    /// variant chosen.
    pub fn build<M>(&self, target: &ClusterVersion, session: SessionHandle) -> (M, &'static str)
    where
        M: Manager,
    {
        match self.resolve::<M>(target) {
            Some(variant) => {
                debug!(
                    "using {} variant '{}' for cluster {}",
                    M::KIND,
                    variant.name(),
                    target
                );
                (variant.build(session), variant.name())
            }
            None => {
                debug!("using base {} manager for cluster {}", M::KIND, target);
                (M::base(session), BASE_VARIANT)
            }
        }
    }
}

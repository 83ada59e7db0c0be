//! Control instance construction.
//!
//! The factory turns a resolved config into a live member of the right
//! shape and attaches it to its parent group. Registration is
//! idempotent: asking for a name the parent already holds returns the
//! existing instance instead of building a second one.

use std::rc::Rc;

use tracing::debug;

use crate::config::ControlConfig;
use crate::error::{Error, Result};
use crate::providers::FormValidators;
use crate::types::ControlKind;

use super::{FormArray, FormControl, FormGroup, FormMember};

/// Builds and attaches live control instances.
pub struct FormFactory {
    validators: Rc<FormValidators>,
}

impl FormFactory {
    pub fn new(validators: Rc<FormValidators>) -> Self {
        Self { validators }
    }

    /// Build a standalone member of the given shape, with the config's
    /// validator options resolved and applied.
    pub fn build(&self, kind: ControlKind, config: &ControlConfig) -> Result<FormMember> {
        let options = self.validators.resolve_options(&config.options)?;
        Ok(match kind {
            ControlKind::Group | ControlKind::Container => {
                FormMember::Group(FormGroup::new(options))
            }
            ControlKind::Array => FormMember::Array(FormArray::new(options)),
            ControlKind::Control => FormMember::Control(FormControl::new(options)),
        })
    }

    /// Build a named member under a parent group, or return the
    /// existing child when the name is already registered.
    pub fn register(
        &self,
        kind: ControlKind,
        config: &ControlConfig,
        name: &str,
        parent: &FormMember,
    ) -> Result<FormMember> {
        let Some(group) = parent.as_group() else {
            return Err(Error::UnsupportedParent {
                name: name.to_string(),
            });
        };

        if let Some(existing) = group.get(name) {
            debug!(name, control = %config.control, "control already registered");
            return Ok(existing);
        }

        let member = self.build(kind, config)?;
        group.add_control(name, member.clone());
        debug!(name, control = %config.control, "control registered");
        Ok(member)
    }
}

//! # Dependency Gate
//!
//! Removes every sub-option whose parent is absent or disabled, repeating
//! until a pass removes nothing.
//!
//! Each pass decides its removals from the state left by the previous pass
//! and only then applies them, so the outcome does not depend on the order
//! options are visited in. A pass removes at least one present option or
//! ends the loop, which bounds the pass count by the number of options.

use crate::option_set::OptionSet;
use crate::registry::OptionRegistry;
use crate::Removal;

/// Gate `options` against the parent links declared in `registry`.
#[must_use]
pub fn gate(mut options: OptionSet, registry: &OptionRegistry) -> OptionSet {
    let mut pass = 0usize;
    loop {
        pass += 1;
        let removals: Vec<(&str, &str)> = registry
            .iter()
            .filter_map(|decl| {
                let parent = decl.parent.as_deref()?;
                (options.is_present(&decl.name) && !options.is_enabled(parent))
                    .then_some((decl.name.as_str(), parent))
            })
            .collect();

        if removals.is_empty() {
            tracing::trace!(passes = pass, "dependency gate reached fixed point");
            return options;
        }

        for (child, parent) in removals {
            options.remove(
                child,
                Removal::Gated {
                    parent: parent.to_string(),
                },
            );
            tracing::debug!(option = child, parent, pass, "gated option");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RequestedOptions;
    use crate::OptionState;

    /// with_platform -> with_platform_glfw -> with_platform_glfw_vulkan -> ..._validation
    fn nested() -> OptionRegistry {
        let mut registry = OptionRegistry::new();
        registry.declare_flag("with_platform", true).expect("declare");
        registry
            .declare_child_flag("with_platform_glfw", true, "with_platform")
            .expect("declare");
        registry
            .declare_child_flag("with_platform_sdl2", true, "with_platform")
            .expect("declare");
        registry
            .declare_child_flag("with_platform_glfw_vulkan", true, "with_platform_glfw")
            .expect("declare");
        registry
            .declare_child_flag(
                "with_platform_glfw_vulkan_validation",
                true,
                "with_platform_glfw_vulkan",
            )
            .expect("declare");
        registry
    }

    #[test]
    fn disabled_parent_removes_children() {
        let registry = nested();
        let set = registry
            .apply(
                &RequestedOptions::new()
                    .with("with_platform", false)
                    .with("with_platform_glfw", true),
            )
            .expect("apply");
        let gated = gate(set, &registry);

        assert!(gated.is_present("with_platform"));
        assert!(!gated.is_present("with_platform_glfw"));
        assert!(!gated.is_present("with_platform_sdl2"));
        assert_eq!(
            gated.get("with_platform_glfw"),
            Some(&OptionState::Absent(Removal::Gated {
                parent: "with_platform".to_string()
            }))
        );
    }

    #[test]
    fn removal_cascades_to_any_depth() {
        let registry = nested();
        let set = registry
            .apply(&RequestedOptions::new().with("with_platform", false))
            .expect("apply");
        let gated = gate(set, &registry);

        assert!(!gated.is_present("with_platform_glfw_vulkan"));
        assert_eq!(
            gated.get("with_platform_glfw_vulkan_validation"),
            Some(&OptionState::Absent(Removal::Gated {
                parent: "with_platform_glfw_vulkan".to_string()
            }))
        );
    }

    #[test]
    fn disabled_middle_level_keeps_siblings() {
        let registry = nested();
        let set = registry
            .apply(&RequestedOptions::new().with("with_platform_glfw", false))
            .expect("apply");
        let gated = gate(set, &registry);

        // A disabled option is still present; only its children go.
        assert!(gated.is_present("with_platform_glfw"));
        assert!(gated.is_enabled("with_platform_sdl2"));
        assert!(!gated.is_present("with_platform_glfw_vulkan"));
        assert!(!gated.is_present("with_platform_glfw_vulkan_validation"));
    }

    #[test]
    fn enabled_chain_untouched() {
        let registry = nested();
        let gated = gate(registry.defaults(), &registry);
        assert_eq!(gated, registry.defaults());
    }

    /// Remove one gated option at a time, visiting declarations last-first.
    fn gate_one_by_one(mut options: OptionSet, registry: &OptionRegistry) -> OptionSet {
        let decls: Vec<_> = registry.iter().collect();
        while let Some((child, parent)) = decls.iter().rev().find_map(|decl| {
            let parent = decl.parent.as_deref()?;
            (options.is_present(&decl.name) && !options.is_enabled(parent))
                .then_some((decl.name.as_str(), parent))
        }) {
            options.remove(
                child,
                Removal::Gated {
                    parent: parent.to_string(),
                },
            );
        }
        options
    }

    #[test]
    fn parent_and_grandchild_removed_in_same_pass() {
        let registry = nested();
        // with_platform_glfw is gated by with_platform, and its own child
        // with_platform_glfw_vulkan is gated by it being disabled: both in pass one.
        let set = registry
            .apply(
                &RequestedOptions::new()
                    .with("with_platform", false)
                    .with("with_platform_glfw", false),
            )
            .expect("apply");

        let batched = gate(set.clone(), &registry);
        let sequential = gate_one_by_one(set, &registry);
        assert_eq!(batched, sequential);

        assert_eq!(
            batched.get("with_platform_glfw"),
            Some(&OptionState::Absent(Removal::Gated {
                parent: "with_platform".to_string()
            }))
        );
        assert_eq!(
            batched.get("with_platform_glfw_vulkan"),
            Some(&OptionState::Absent(Removal::Gated {
                parent: "with_platform_glfw".to_string()
            }))
        );
        assert_eq!(
            batched.get("with_platform_glfw_vulkan_validation"),
            Some(&OptionState::Absent(Removal::Gated {
                parent: "with_platform_glfw_vulkan".to_string()
            }))
        );
    }

    #[test]
    fn gate_is_idempotent() {
        let registry = nested();
        let set = registry
            .apply(&RequestedOptions::new().with("with_platform", false))
            .expect("apply");
        let once = gate(set, &registry);
        let twice = gate(once.clone(), &registry);
        assert_eq!(once, twice);
    }
}

//! Project bootstrap for the [trellis_component] framework.
//!
//! A project is a directory holding a `project_config.yml` file and, by convention, a
//! `component` extension package. [Project](project::Project) loads the configuration,
//! resolves component declarations (framework defaults first, project extensions after)
//! and drives the type registry and component manager to produce a ready-to-use
//! component graph:
//!
//! ```no_run
//! use trellis::project::Project;
//!
//! # async fn bootstrap() -> Result<(), Box<dyn std::error::Error>> {
//! let project = Project::new("my_project", None)?;
//! let manager = project.create_component_manager()?;
//! manager.start_all().await?;
//! // ...
//! manager.dispose_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logger;
pub mod project;

//! Layout loading and assembly.

use crate::{
    resolver::{with_timeout, RenderContext, SectionOutcome, SectionResolver},
    Error, Result,
};
use casino_lobby_types::{
    LobbyLayout, OmissionReason, OmittedSection, Platform, ResolvedLayout, ResolvedSection,
    SectionBlock,
};
use futures::future::join_all;
use tracing::{debug, info, warn};

/// Which layout to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutRequest {
    /// Exactly this layout.
    Slug(String),
    /// The platform's default layout, or any layout for the platform.
    Platform(Platform),
}

/// Loads layouts and resolves their sections into a render model.
#[derive(Clone)]
pub struct LayoutAssembler {
    resolver: SectionResolver,
}

impl LayoutAssembler {
    pub fn new(resolver: SectionResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &SectionResolver {
        &self.resolver
    }

    /// Fetches the layout document for `request`.
    ///
    /// Source failures here are not contained: without a layout there is
    /// nothing to render.
    pub async fn load(&self, request: &LayoutRequest) -> Result<LobbyLayout> {
        let layouts = self.resolver.sources().layouts.as_ref();
        let timeout = self.resolver.call_timeout();
        match request {
            LayoutRequest::Slug(slug) => {
                with_timeout(timeout, layouts.by_slug(slug))
                    .await?
                    .ok_or_else(|| Error::not_found("layout", slug.clone()))
            }
            LayoutRequest::Platform(platform) => {
                if let Some(layout) =
                    with_timeout(timeout, layouts.default_for(*platform)).await?
                {
                    return Ok(layout);
                }
                debug!(%platform, "no default layout, using first layout for platform");
                with_timeout(timeout, layouts.any_for(*platform))
                    .await?
                    .ok_or_else(|| Error::not_found("layout", platform.to_string()))
            }
        }
    }

    pub async fn resolve_layout(
        &self,
        request: &LayoutRequest,
        context: &RenderContext,
    ) -> Result<ResolvedLayout> {
        let layout = self.load(request).await?;
        Ok(self.assemble(&layout, context).await)
    }

    /// Resolves every section of `layout` concurrently and reassembles them in
    /// authored order. Blocks that failed to decode are reported as omitted.
    pub async fn assemble(
        &self,
        layout: &LobbyLayout,
        context: &RenderContext,
    ) -> ResolvedLayout {
        let outcomes = join_all(layout.sections.iter().enumerate().map(
            |(position, block)| async move {
                match block {
                    SectionBlock::Section(config) => {
                        self.resolver.resolve_section(config, context).await
                    }
                    SectionBlock::Invalid(invalid) => {
                        warn!(
                            layout = %layout.slug,
                            position,
                            block_type = invalid.block_type.as_deref().unwrap_or("<missing>"),
                            error = %invalid.error,
                            "skipping undecodable section"
                        );
                        SectionOutcome::Omitted(OmissionReason::InvalidConfig)
                    }
                }
            },
        ))
        .await;

        let mut sections = Vec::new();
        let mut omitted = Vec::new();
        for (position, (block, outcome)) in layout.sections.iter().zip(outcomes).enumerate() {
            match outcome {
                SectionOutcome::Resolved(content) => sections.push(ResolvedSection {
                    position,
                    title: block.config().and_then(|c| c.title()).map(str::to_string),
                    subtitle: block.config().and_then(|c| c.subtitle()).map(str::to_string),
                    content,
                }),
                SectionOutcome::Omitted(reason) => omitted.push(OmittedSection {
                    position,
                    kind: block.kind(),
                    reason,
                }),
            }
        }
        info!(
            layout = %layout.slug,
            resolved = sections.len(),
            omitted = omitted.len(),
            "assembled lobby layout"
        );

        ResolvedLayout {
            slug: layout.slug.clone(),
            name: layout.name.clone(),
            platform: layout.platform,
            sections,
            omitted,
        }
    }
}

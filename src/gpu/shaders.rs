//! WGSL sources for every GPU pass.
//!
//! Fullscreen passes share one vertex stage; [`fullscreen`] prepends it to a
//! fragment body. Uniform struct layouts here must match the `#[repr(C)]`
//! structs in the parent module.

/// Instanced billboard pass: one camera-facing quad per particle position.
pub const PARTICLE_SHADER: &str = r#"
struct Particles {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    color: vec4<f32>,
    size: f32,
};

@group(0) @binding(0)
var<uniform> particles: Particles;
@group(0) @binding(1)
var sprite: texture_2d<f32>;
@group(0) @binding(2)
var sprite_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec3<f32>,
) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[vertex_index];
    let eye = particles.view * vec4<f32>(position, 1.0);
    // Divide out the focal length so on-screen size is size * (h / 2) / depth.
    let offset = corner * particles.size * 0.5 / particles.proj[1][1];

    var out: VertexOutput;
    out.clip_position = particles.proj * vec4<f32>(eye.xy + offset, eye.z, 1.0);
    out.uv = vec2<f32>(corner.x, -corner.y) * 0.5 + 0.5;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(sprite, sprite_sampler, in.uv);
    return vec4<f32>(particles.color.rgb * texel.rgb, particles.color.a * texel.a);
}
"#;

/// Shared vertex stage for fullscreen passes (one oversized triangle).
pub const FULLSCREEN_VERTEX: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}
"#;

/// Luminosity high-pass feeding the bloom chain.
pub const BRIGHT_FRAGMENT: &str = r#"
struct Bright {
    threshold: f32,
    knee: f32,
    pad0: f32,
    pad1: f32,
};

@group(0) @binding(0)
var source: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;
@group(0) @binding(2)
var<uniform> params: Bright;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(source, source_sampler, in.uv);
    let lum = dot(texel.rgb, vec3<f32>(0.2126, 0.7152, 0.0722));
    let keep = smoothstep(params.threshold, params.threshold + params.knee, lum);
    return texel * keep;
}
"#;

/// One direction of a separable Gaussian blur.
pub const BLUR_FRAGMENT: &str = r#"
struct Blur {
    direction: vec2<f32>,
    texel: vec2<f32>,
    radius: u32,
    pad0: u32,
    pad1: u32,
    pad2: u32,
    weights: array<vec4<f32>, 3>,
};

@group(0) @binding(0)
var source: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;
@group(0) @binding(2)
var<uniform> params: Blur;

fn weight(i: u32) -> f32 {
    return params.weights[i / 4u][i % 4u];
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let stride = params.direction * params.texel;
    var sum = textureSample(source, source_sampler, in.uv).rgb * weight(0u);
    for (var i = 1u; i < params.radius; i = i + 1u) {
        let offset = stride * f32(i);
        let a = textureSample(source, source_sampler, in.uv + offset).rgb;
        let b = textureSample(source, source_sampler, in.uv - offset).rgb;
        sum = sum + (a + b) * weight(i);
    }
    return vec4<f32>(sum, 1.0);
}
"#;

/// Weighted sum of the blurred mips, blended additively over the scene.
pub const COMPOSITE_FRAGMENT: &str = r#"
struct Composite {
    weights_a: vec4<f32>,
    weights_b: vec4<f32>,
};

@group(0) @binding(0)
var mip0: texture_2d<f32>;
@group(0) @binding(1)
var mip1: texture_2d<f32>;
@group(0) @binding(2)
var mip2: texture_2d<f32>;
@group(0) @binding(3)
var mip3: texture_2d<f32>;
@group(0) @binding(4)
var mip4: texture_2d<f32>;
@group(0) @binding(5)
var mip_sampler: sampler;
@group(0) @binding(6)
var<uniform> params: Composite;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let glow = textureSample(mip0, mip_sampler, in.uv).rgb * params.weights_a.x
        + textureSample(mip1, mip_sampler, in.uv).rgb * params.weights_a.y
        + textureSample(mip2, mip_sampler, in.uv).rgb * params.weights_a.z
        + textureSample(mip3, mip_sampler, in.uv).rgb * params.weights_a.w
        + textureSample(mip4, mip_sampler, in.uv).rgb * params.weights_b.x;
    return vec4<f32>(glow, 0.0);
}
"#;

/// Merge the current frame with the decayed previous output.
pub const AFTERIMAGE_FRAGMENT: &str = r#"
struct Afterimage {
    damping: f32,
    cutoff: f32,
    pad0: f32,
    pad1: f32,
};

@group(0) @binding(0)
var current: texture_2d<f32>;
@group(0) @binding(1)
var previous: texture_2d<f32>;
@group(0) @binding(2)
var frame_sampler: sampler;
@group(0) @binding(3)
var<uniform> params: Afterimage;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let fresh = textureSample(current, frame_sampler, in.uv);
    let old = textureSample(previous, frame_sampler, in.uv);
    let alive = select(vec4<f32>(0.0), vec4<f32>(1.0), old > vec4<f32>(params.cutoff));
    return max(fresh, old * params.damping * alive);
}
"#;

/// Copy the HDR result to the swapchain.
pub const BLIT_FRAGMENT: &str = r#"
@group(0) @binding(0)
var source: texture_2d<f32>;
@group(0) @binding(1)
var source_sampler: sampler;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(textureSample(source, source_sampler, in.uv).rgb, 1.0);
}
"#;

/// Complete module source for a fullscreen pass with the given fragment stage.
pub fn fullscreen(fragment: &str) -> String {
    format!("{FULLSCREEN_VERTEX}\n{fragment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_particle_shader_valid() {
        validate_wgsl(PARTICLE_SHADER).unwrap();
    }

    #[test]
    fn test_fullscreen_shaders_valid() {
        for (name, fragment) in [
            ("bright", BRIGHT_FRAGMENT),
            ("blur", BLUR_FRAGMENT),
            ("composite", COMPOSITE_FRAGMENT),
            ("afterimage", AFTERIMAGE_FRAGMENT),
            ("blit", BLIT_FRAGMENT),
        ] {
            if let Err(e) = validate_wgsl(&fullscreen(fragment)) {
                panic!("{} shader invalid: {}", name, e);
            }
        }
    }
}

//! DEF identifiers derived from scene names.
//!
//! X3D DEF names cannot collide with node type names and cannot contain
//! whitespace, quotes or the characters that delimit fields. User-facing names
//! go through [`clean_name`]; synthetic nodes use [`SecureNamer`], which adds a
//! counter so they never clash.

/// Node and keyword names that may not be used as DEF identifiers.
pub const RESERVED_NAMES: &[&str] = &[
    "Anchor", "Appearance", "Arc2D", "ArcClose2D", "AudioClip", "Background", "Billboard",
    "BooleanFilter", "BooleanSequencer", "BooleanToggle", "BooleanTrigger", "Box", "Circle2D",
    "Collision", "Color", "ColorInterpolator", "ColorRGBA", "component", "Cone", "connect",
    "Contour2D", "ContourPolyline2D", "Coordinate", "CoordinateDouble", "CoordinateInterpolator",
    "CoordinateInterpolator2D", "Cylinder", "CylinderSensor", "DirectionalLight", "Disk2D",
    "ElevationGrid", "EspduTransform", "EXPORT", "ExternProtoDeclare", "Extrusion", "field",
    "fieldValue", "FillProperties", "Fog", "FontStyle", "GeoCoordinate", "GeoElevationGrid",
    "GeoLocationLocation", "GeoLOD", "GeoMetadata", "GeoOrigin", "GeoPositionInterpolator",
    "GeoTouchSensor", "GeoViewpoint", "Group", "HAnimDisplacer", "HAnimHumanoid", "HAnimJoint",
    "HAnimSegment", "HAnimSite", "head", "ImageTexture", "IMPORT", "IndexedFaceSet",
    "IndexedLineSet", "IndexedTriangleFanSet", "IndexedTriangleSet", "IndexedTriangleStripSet",
    "Inline", "IntegerSequencer", "IntegerTrigger", "IS", "KeySensor", "LineProperties", "LineSet",
    "LoadSensor", "LOD", "Material", "meta", "MetadataDouble", "MetadataFloat", "MetadataInteger",
    "MetadataSet", "MetadataString", "MovieTexture", "MultiTexture", "MultiTextureCoordinate",
    "MultiTextureTransform", "NavigationInfo", "Normal", "NormalInterpolator", "NurbsCurve",
    "NurbsCurve2D", "NurbsOrientationInterpolator", "NurbsPatchSurface",
    "NurbsPositionInterpolator", "NurbsSet", "NurbsSurfaceInterpolator", "NurbsSweptSurface",
    "NurbsSwungSurface", "NurbsTextureCoordinate", "NurbsTrimmedSurface", "OrientationInterpolator",
    "PixelTexture", "PlaneSensor", "PointLight", "PointSet", "Polyline2D", "Polypoint2D",
    "PositionInterpolator", "PositionInterpolator2D", "ProtoBody", "ProtoDeclare", "ProtoInstance",
    "ProtoInterface", "ProximitySensor", "ReceiverPdu", "Rectangle2D", "ROUTE", "ScalarInterpolator",
    "Scene", "Script", "Shape", "SignalPdu", "Sound", "Sphere", "SphereSensor", "SpotLight",
    "StaticGroup", "StringSensor", "Switch", "Text", "TextureBackground", "TextureCoordinate",
    "TextureCoordinateGenerator", "TextureTransform", "TimeSensor", "TimeTrigger", "TouchSensor",
    "Transform", "TransmitterPdu", "TriangleFanSet", "TriangleSet", "TriangleSet2D",
    "TriangleStripSet", "Viewpoint", "VisibilitySensor", "WorldInfo", "X3D", "XvlShell",
    "VertexShader", "FragmentShader", "MultiShaderAppearance", "ShaderAppearance",
];

/// Prefix added to names that collide with a reserved word.
pub const RESERVED_PREFIX: &str = "rsvd_";

/// Replaced with `_` in user-facing names, in this order.
const CLEAN_REPLACEMENTS: &[&str] = &[" ", "\"", "#", "'", ", ", ".", "[", "\\", "]", "{", "}"];

/// Replaced with `_` in synthetic names (spaces are kept).
const SECURE_REPLACEMENTS: &[&str] = &["\"", "#", "'", ", ", ".", "[", "\\", "]", "{", "}"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

fn starts_with_digit(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn replace_all(name: &str, patterns: &[&str]) -> String {
    patterns
        .iter()
        .fold(name.to_string(), |acc, bad| acc.replace(bad, "_"))
}

/// Make a DEF identifier from an object, mesh or image name.
pub fn clean_name(name: &str) -> String {
    clean_name_with_prefix(name, RESERVED_PREFIX)
}

/// Like [`clean_name`] but with a custom prefix for reserved words.
/// Materials use an empty prefix since their DEFs are already prefixed.
pub fn clean_name_with_prefix(name: &str, prefix: &str) -> String {
    let mut new_name = if is_reserved(name) {
        format!("{}{}", prefix, name)
    } else {
        name.to_string()
    };

    if starts_with_digit(&new_name) {
        new_name.insert(0, '_');
    }

    replace_all(&new_name, CLEAN_REPLACEMENTS)
}

/// Generates unique identifiers for synthetic nodes.
///
/// One namer belongs to one export; ids restart at zero for every document.
#[derive(Debug, Default)]
pub struct SecureNamer {
    next_id: u32,
}

impl SecureNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce an identifier for `name`, unique within this namer.
    pub fn secure_name(&mut self, name: &str) -> String {
        let candidate = format!("{}{}", name, self.next_id);
        self.next_id += 1;

        if candidate.chars().count() <= 3 {
            return format!("_{}", self.next_id);
        }

        let candidate = replace_all(&candidate, SECURE_REPLACEMENTS);
        if is_reserved(&candidate) {
            let head: String = candidate.chars().take(3).collect();
            format!("{}_{}", head, self.next_id)
        } else if starts_with_digit(&candidate) {
            format!("_{}{}", candidate, self.next_id)
        } else {
            candidate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_name() {
        assert_eq!(clean_name("Cube"), "Cube");
    }

    #[test]
    fn test_clean_reserved_name() {
        assert_eq!(clean_name("Transform"), "rsvd_Transform");
        assert_eq!(clean_name_with_prefix("Material", ""), "Material");
    }

    #[test]
    fn test_clean_leading_digit() {
        assert_eq!(clean_name("1st"), "_1st");
    }

    #[test]
    fn test_clean_bad_characters() {
        assert_eq!(clean_name("My Mesh.001"), "My_Mesh_001");
        assert_eq!(clean_name("a\"b#c'd[e]f{g}h\\i"), "a_b_c_d_e_f_g_h_i");
        // Spaces go first, so ", " only ever leaves the comma behind.
        assert_eq!(clean_name("a, b"), "a,_b");
    }

    #[test]
    fn test_clean_empty_name() {
        assert_eq!(clean_name(""), "");
    }

    #[test]
    fn test_secure_name_counter() {
        let mut namer = SecureNamer::new();
        assert_eq!(namer.secure_name("World"), "World0");
        assert_eq!(namer.secure_name("World"), "World1");
    }

    #[test]
    fn test_secure_name_short_input() {
        let mut namer = SecureNamer::new();
        // "W0" is too short and becomes "_" plus the advanced counter.
        assert_eq!(namer.secure_name("W"), "_1");
    }

    #[test]
    fn test_secure_name_digit_and_characters() {
        let mut namer = SecureNamer::new();
        assert_eq!(namer.secure_name("3D.World"), "_3D_World01");
        assert_eq!(namer.secure_name("my sky"), "my sky1");
    }

    #[test]
    fn test_namers_are_independent() {
        let mut a = SecureNamer::new();
        let mut b = SecureNamer::new();
        a.secure_name("World");
        assert_eq!(b.secure_name("World"), "World0");
    }
}

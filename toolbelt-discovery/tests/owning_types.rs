//! Tools whose signatures name their owning type through `Self`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use toolbelt_discovery::{CallableDescriptor, CapabilityRegistry, Services, toolbox};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    x: i64,
    y: i64,
}

#[toolbox]
impl Point {
    #[tool(description = "The origin")]
    pub fn origin() -> Self {
        Self { x: 0, y: 0 }
    }

    #[tool(description = "Mirrors a point through the origin")]
    pub fn mirror(point: Self) -> Self {
        Self {
            x: -point.x,
            y: -point.y,
        }
    }

    #[tool]
    pub fn centroid(points: Vec<Self>) -> Option<Self> {
        let count = i64::try_from(points.len()).ok().filter(|n| *n > 0)?;
        let (x, y) = points
            .iter()
            .fold((0, 0), |(x, y), point| (x + point.x, y + point.y));
        Some(Self {
            x: x / count,
            y: y / count,
        })
    }
}

fn descriptors() -> Vec<CallableDescriptor> {
    CapabilityRegistry::new(Arc::new(Services::new()))
        .enumerate()
        .unwrap()
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn self_is_described_by_the_owning_type_name() {
    let descriptors = descriptors();
    let descriptions: Vec<_> = descriptors.iter().map(CallableDescriptor::description).collect();
    assert_eq!(
        descriptions,
        [
            "The origin Parameters: . Returns: Point.",
            "Mirrors a point through the origin Parameters: Point point. Returns: Point.",
            "No description provided. Parameters: Point[] points. Returns: Option<Point>.",
        ]
    );
}

#[tokio::test]
async fn self_parameters_deserialise_into_the_owning_type() {
    let descriptors = descriptors();

    let mirrored = descriptors[1]
        .invoke(args(json!({ "point": { "x": 2, "y": -3 } })), None)
        .await
        .unwrap();
    assert_eq!(mirrored, json!({ "x": -2, "y": 3 }));

    let centroid = descriptors[2]
        .invoke(
            args(json!({ "points": [{ "x": 0, "y": 0 }, { "x": 4, "y": 2 }] })),
            None,
        )
        .await
        .unwrap();
    assert_eq!(centroid, json!({ "x": 2, "y": 1 }));
}

//! Identifier-addressed generation: handles, edge ids, block data and actions

use cosim_gateway::{Frame, GatewayError, Generation, HandleKind, Matrix, Value};
use cosim_tests::{approx_eq, as_bool, as_f64, as_i32s, Harness};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Implicit coupling with initial data, so every action shows up
const IMPLICIT_CONFIG: &str = r#"
participant = "Solid"
dimensions = 2
time_window_size = 0.1
max_time = 0.2
max_iterations = 2
initial_data = true

[[meshes]]
name = "Solid-Mesh"
connectivity = true

[[data]]
name = "Temperature"
mesh = "Solid-Mesh"

[[data]]
name = "Displacement"
mesh = "Solid-Mesh"
dimensions = 2
"#;

struct Ids {
    mesh: i32,
    temperature: i32,
    displacement: i32,
}

/// Constructed session with four vertices and handles for mesh and data
fn setup() -> (Harness, Ids) {
    let mut h = Harness::with_engine_config(Generation::SolverInterface, IMPLICIT_CONFIG);
    h.construct().unwrap();

    let mesh = as_i32s(&h.ok("getMeshID", [Value::str("Solid-Mesh")]))[0];
    let temperature = as_i32s(&h.ok("getDataID", [Value::str("Temperature"), Value::int32(mesh)]))[0];
    let displacement =
        as_i32s(&h.ok("getDataID", [Value::str("Displacement"), Value::int32(mesh)]))[0];

    let ids = h.ok(
        "setMeshVertices",
        [
            Value::int32(mesh),
            Value::int32(4),
            Value::floats(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0]),
        ],
    );
    assert_eq!(as_i32s(&ids), vec![0, 1, 2, 3]);
    (
        h,
        Ids {
            mesh,
            temperature,
            displacement,
        },
    )
}

fn action_required(h: &mut Harness, action: &str) -> bool {
    as_bool(&h.ok("isActionRequired", [Value::str(action)]))
}

#[test]
fn test_handles_are_session_wide_and_stable() {
    let (mut h, ids) = setup();
    assert_eq!((ids.mesh, ids.temperature, ids.displacement), (0, 1, 2));

    // Repeated lookups hand out the same id
    assert_eq!(as_i32s(&h.ok("getMeshID", [Value::str("Solid-Mesh")])), vec![0]);
    assert_eq!(
        as_i32s(&h.ok("getDataID", [Value::str("Temperature"), Value::int32(0)])),
        vec![1]
    );

    assert!(as_bool(&h.ok("hasMesh", [Value::str("Solid-Mesh")])));
    assert!(!as_bool(&h.ok("hasMesh", [Value::str("Fluid-Mesh")])));
    assert!(as_bool(&h.ok("hasData", [Value::str("Temperature"), Value::int32(0)])));
    assert!(!as_bool(&h.ok("hasData", [Value::str("Pressure"), Value::int32(0)])));

    let err = h.call("getMeshID", [Value::str("Fluid-Mesh")]).unwrap_err();
    assert!(matches!(err, GatewayError::EngineFailure(_)));
}

#[rstest]
#[case::mesh("getMeshVertexSize", vec![Value::int32(7)], HandleKind::Mesh)]
#[case::data("getDataID", vec![Value::str("Temperature"), Value::int32(7)], HandleKind::Mesh)]
#[case::edge(
    "setMeshTriangle",
    vec![Value::int32(0), Value::int32(0), Value::int32(1), Value::int32(9)],
    HandleKind::Edge
)]
#[case::data_handle(
    "readScalarData",
    vec![Value::int32(0), Value::int32(0)],
    HandleKind::Data
)]
fn test_unknown_handles(#[case] name: &str, #[case] args: Vec<Value>, #[case] kind: HandleKind) {
    let (mut h, _) = setup();
    h.ok("setMeshEdge", [Value::int32(0), Value::int32(0), Value::int32(1)]);
    h.ok("setMeshEdge", [Value::int32(0), Value::int32(1), Value::int32(2)]);

    match h.call(name, args).unwrap_err() {
        GatewayError::InvalidHandle { kind: got, .. } => assert_eq!(got, kind),
        other => panic!("expected invalid handle, got {}", other),
    }
}

#[test]
fn test_triangles_and_quads_from_edge_ids() {
    let (mut h, ids) = setup();
    let m = Value::int32(ids.mesh);
    let edge = |h: &mut Harness, a: i32, b: i32| {
        as_i32s(&h.ok("setMeshEdge", [m.clone(), Value::int32(a), Value::int32(b)]))[0]
    };

    let e01 = edge(&mut h, 0, 1);
    let e12 = edge(&mut h, 1, 2);
    let e20 = edge(&mut h, 2, 0);
    let e23 = edge(&mut h, 2, 3);
    let e30 = edge(&mut h, 3, 0);
    assert_eq!(vec![e01, e12, e20, e23, e30], vec![0, 1, 2, 3, 4]);

    let edges = |list: &[i32]| list.iter().map(|e| Value::int32(*e)).collect::<Vec<_>>();

    h.ok(
        "setMeshTriangle",
        std::iter::once(m.clone()).chain(edges(&[e01, e12, e20])),
    );
    h.ok(
        "setMeshQuad",
        std::iter::once(m.clone()).chain(edges(&[e01, e23, e12, e30])),
    );

    // Edges that do not close a triangle are rejected
    let err = h
        .call(
            "setMeshTriangle",
            std::iter::once(m.clone()).chain(edges(&[e01, e12, e23])),
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::EngineFailure(_)));

    // The vertex-id variant goes straight to the engine
    h.ok(
        "setMeshTriangleWithEdges",
        [m.clone(), Value::int32(0), Value::int32(2), Value::int32(3)],
    );

    let counts = h
        .session
        .engine()
        .unwrap()
        .connectivity_counts("Solid-Mesh")
        .unwrap();
    assert_eq!(counts, [5, 2, 1, 0]);
    assert!(as_bool(&h.ok("isMeshConnectivityRequired", [m])));
}

#[test]
fn test_block_data_round_trip() {
    let (mut h, ids) = setup();
    let all = Value::Int32(vec![0, 1, 2, 3]);
    assert!(action_required(&mut h, "write-initial-data"));

    h.ok(
        "writeBlockScalarData",
        [
            Value::int32(ids.temperature),
            Value::int32(4),
            all.clone(),
            Value::floats(vec![1.0, 2.0, 3.0, 4.0]),
        ],
    );
    h.ok(
        "writeBlockVectorData",
        [
            Value::int32(ids.displacement),
            Value::int32(2),
            Value::Int32(vec![0, 3]),
            Value::floats(vec![0.1, 0.2, 3.1, 3.2]),
        ],
    );
    h.ok("markActionFulfilled", [Value::str("write-initial-data")]);

    let dt = as_f64(&h.ok("initialize", []));
    assert!(approx_eq(dt, 0.1));

    let row = h.ok(
        "readBlockScalarData",
        [Value::int32(ids.temperature), Value::int32(4), all.clone(), Value::Bool(false)],
    );
    assert_eq!(row, Frame::from(Value::Float64(Matrix::row(vec![1.0, 2.0, 3.0, 4.0]))));

    let column = h.ok(
        "readBlockScalarData",
        [Value::int32(ids.temperature), Value::int32(4), all, Value::Bool(true)],
    );
    assert_eq!(
        column,
        Frame::from(Value::Float64(Matrix::column(vec![1.0, 2.0, 3.0, 4.0])))
    );

    // Vector reads come back as [dim, size]
    let vectors = h.ok(
        "readBlockVectorData",
        [Value::int32(ids.displacement), Value::int32(2), Value::Int32(vec![3, 0])],
    );
    let expected = Matrix::from_column_major(2, 2, vec![3.1, 3.2, 0.1, 0.2]).unwrap();
    assert_eq!(vectors, Frame::from(Value::Float64(expected)));
}

#[test]
fn test_single_vertex_data() {
    let (mut h, ids) = setup();
    h.ok(
        "writeScalarData",
        [Value::int32(ids.temperature), Value::int32(2), Value::float64(7.5)],
    );
    h.ok(
        "writeVectorData",
        [Value::int32(ids.displacement), Value::int32(1), Value::floats(vec![1.5, -1.5])],
    );
    h.ok("initialize", []);

    let scalar = h.ok("readScalarData", [Value::int32(ids.temperature), Value::int32(2)]);
    assert_eq!(scalar, Frame::from(Value::float64(7.5)));

    let vector = h.ok("readVectorData", [Value::int32(ids.displacement), Value::int32(1)]);
    assert_eq!(vector, Frame::from(Value::Float64(Matrix::column(vec![1.5, -1.5]))));
}

#[test]
fn test_scalar_and_vector_ops_check_rank() {
    let (mut h, ids) = setup();

    let err = h
        .call(
            "writeBlockScalarData",
            [
                Value::int32(ids.displacement),
                Value::int32(2),
                Value::Int32(vec![0, 1]),
                Value::floats(vec![1.0, 2.0]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    let err = h
        .call(
            "writeVectorData",
            [Value::int32(ids.temperature), Value::int32(0), Value::floats(vec![1.0])],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));

    // Count and id list disagree
    let err = h
        .call(
            "writeBlockScalarData",
            [
                Value::int32(ids.temperature),
                Value::int32(3),
                Value::Int32(vec![0, 1]),
                Value::floats(vec![1.0, 2.0, 3.0]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));
}

#[test]
fn test_implicit_coupling_actions() {
    let (mut h, _) = setup();
    h.ok("initialize", []);
    assert!(!action_required(&mut h, "write-initial-data"));
    assert!(action_required(&mut h, "write-iteration-checkpoint"));
    assert!(!action_required(&mut h, "read-iteration-checkpoint"));

    // First iteration does not converge: the window repeats
    let dt = as_f64(&h.ok("advance", [Value::float64(0.1)]));
    assert!(approx_eq(dt, 0.1));
    assert!(action_required(&mut h, "read-iteration-checkpoint"));
    assert!(!as_bool(&h.ok("isTimeWindowComplete", [])));
    h.ok("markActionFulfilled", [Value::str("read-iteration-checkpoint")]);

    h.ok("advance", [Value::float64(0.1)]);
    assert!(as_bool(&h.ok("isTimeWindowComplete", [])));
    assert!(action_required(&mut h, "write-iteration-checkpoint"));
    assert!(as_bool(&h.ok("isCouplingOngoing", [])));

    let err = h.call("isActionRequired", [Value::str("converge")]).unwrap_err();
    assert!(matches!(err, GatewayError::ArgumentShapeMismatch { .. }));
}

#[test]
fn test_handles_do_not_survive_destruct() {
    let (mut h, ids) = setup();
    assert_eq!(h.ok("getDimensions", []), Frame::from(Value::UInt8(2)));
    h.ok("destructor", []);
    h.construct().unwrap();

    let err = h.call("getMeshVertexSize", [Value::int32(ids.mesh)]).unwrap_err();
    assert!(matches!(
        err,
        GatewayError::InvalidHandle {
            kind: HandleKind::Mesh,
            ..
        }
    ));

    // New handles never reuse an id from before the destruct
    let mesh = as_i32s(&h.ok("getMeshID", [Value::str("Solid-Mesh")]))[0];
    assert_eq!(mesh, 3);
}

#[test]
fn test_version_through_session() {
    let (mut h, _) = setup();
    let out = h.ok("getVersionInformation", []);
    assert!(out.get(0).and_then(Value::as_str).unwrap().starts_with("cosim-loopback "));
}

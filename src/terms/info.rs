//! Static descriptions of all terms.
use crate::cache::QuantityKind::{MaterialAtQp, StateAtQp, Volume};
use crate::region::GeometryKind::{Surface, Volume as VolumeDomain};
use crate::term::ArgKind::{Material, MaterialSeries, Parameter, State, TimeStep, Virtual};
use crate::term::{ArgType, CacheUse, GeometryRequirement, HistoryWindow, Reduction, TermInfo};

const fn arg(role: &'static str, kind: crate::term::ArgKind) -> ArgType {
    ArgType { role, kind }
}

const fn volume_of(role: &'static str) -> GeometryRequirement {
    GeometryRequirement {
        kind: VolumeDomain,
        role,
    }
}

const fn surface_of(role: &'static str) -> GeometryRequirement {
    GeometryRequirement { kind: Surface, role }
}

const fn cache(kind: crate::cache::QuantityKind, roles: &'static [&'static str]) -> CacheUse {
    CacheUse {
        kind,
        roles,
        history: None,
    }
}

pub(crate) static INTEGRATE_VOLUME: TermInfo = TermInfo {
    name: "di_volume_integrate",
    arg_types: &[arg("parameter", Parameter)],
    geometry: &[volume_of("parameter")],
    use_caches: &[cache(StateAtQp, &["parameter"])],
    reduction: Reduction::Region,
};

pub(crate) static INTEGRATE_VOLUME_OPERATOR: TermInfo = TermInfo {
    name: "dw_volume_integrate",
    arg_types: &[arg("virtual", Virtual)],
    geometry: &[volume_of("virtual")],
    use_caches: &[],
    reduction: Reduction::ElementDofs,
};

pub(crate) static INTEGRATE_SURFACE: TermInfo = TermInfo {
    name: "d_surface_integrate",
    arg_types: &[arg("parameter", Parameter)],
    geometry: &[surface_of("parameter")],
    use_caches: &[cache(StateAtQp, &["parameter"])],
    reduction: Reduction::Region,
};

pub(crate) static INTEGRATE_SURFACE_OPERATOR: TermInfo = TermInfo {
    name: "dw_surface_integrate",
    arg_types: &[arg("material", Material), arg("virtual", Virtual)],
    geometry: &[surface_of("virtual")],
    use_caches: &[cache(MaterialAtQp, &["material"])],
    reduction: Reduction::ElementDofs,
};

pub(crate) static DOT_PRODUCT_VOLUME: TermInfo = TermInfo {
    name: "d_volume_dot",
    arg_types: &[arg("parameter_1", Parameter), arg("parameter_2", Parameter)],
    geometry: &[volume_of("parameter_1"), volume_of("parameter_2")],
    use_caches: &[cache(StateAtQp, &["parameter_1"]), cache(StateAtQp, &["parameter_2"])],
    reduction: Reduction::Region,
};

pub(crate) static DOT_PRODUCT_SURFACE: TermInfo = TermInfo {
    name: "d_surface_dot",
    arg_types: &[arg("parameter_1", Parameter), arg("parameter_2", Parameter)],
    geometry: &[surface_of("parameter_1"), surface_of("parameter_2")],
    use_caches: &[cache(StateAtQp, &["parameter_1"]), cache(StateAtQp, &["parameter_2"])],
    reduction: Reduction::Region,
};

pub(crate) static VOLUME: TermInfo = TermInfo {
    name: "d_volume",
    arg_types: &[arg("parameter", Parameter)],
    geometry: &[volume_of("parameter")],
    use_caches: &[cache(Volume, &["parameter"])],
    reduction: Reduction::Region,
};

pub(crate) static AVERAGE_VOLUME_MAT: TermInfo = TermInfo {
    name: "de_volume_average_mat",
    arg_types: &[arg("material", Material), arg("parameter", Parameter)],
    geometry: &[volume_of("parameter")],
    use_caches: &[cache(MaterialAtQp, &["material"]), cache(Volume, &["parameter"])],
    reduction: Reduction::Element,
};

pub(crate) static INTEGRATE_VOLUME_MAT: TermInfo = TermInfo {
    name: "di_volume_integrate_mat",
    arg_types: &[arg("material", Material), arg("parameter", Parameter)],
    geometry: &[volume_of("parameter")],
    use_caches: &[cache(MaterialAtQp, &["material"])],
    reduction: Reduction::Region,
};

pub(crate) static WDOT_PRODUCT_VOLUME: TermInfo = TermInfo {
    name: "d_volume_wdot",
    arg_types: &[
        arg("material", Material),
        arg("parameter_1", Parameter),
        arg("parameter_2", Parameter),
    ],
    geometry: &[volume_of("parameter_1"), volume_of("parameter_2")],
    use_caches: &[
        cache(StateAtQp, &["parameter_1"]),
        cache(StateAtQp, &["parameter_2"]),
        cache(MaterialAtQp, &["material"]),
    ],
    reduction: Reduction::Region,
};

pub(crate) static WDOT_PRODUCT_VOLUME_OPERATOR: TermInfo = TermInfo {
    name: "dw_volume_wdot",
    arg_types: &[arg("material", Material), arg("virtual", Virtual), arg("state", State)],
    geometry: &[volume_of("virtual"), volume_of("state")],
    use_caches: &[cache(StateAtQp, &["state"]), cache(MaterialAtQp, &["material"])],
    reduction: Reduction::ElementDofs,
};

pub(crate) static WDOT_PRODUCT_VOLUME_OPERATOR_DT: TermInfo = TermInfo {
    name: "dw_volume_wdot_dt",
    arg_types: &[
        arg("ts", TimeStep),
        arg("material", Material),
        arg("virtual", Virtual),
        arg("state", State),
        arg("parameter", Parameter),
    ],
    geometry: &[volume_of("virtual"), volume_of("state")],
    use_caches: &[
        CacheUse {
            kind: StateAtQp,
            roles: &["state"],
            history: Some(HistoryWindow::Bounded { current: 2, previous: 2 }),
        },
        cache(MaterialAtQp, &["material"]),
    ],
    reduction: Reduction::ElementDofs,
};

pub(crate) static WDOT_PRODUCT_VOLUME_OPERATOR_TH: TermInfo = TermInfo {
    name: "dw_volume_wdot_th",
    arg_types: &[
        arg("ts", TimeStep),
        arg("material", MaterialSeries),
        arg("virtual", Virtual),
        arg("state", State),
        arg("parameter", Parameter),
    ],
    geometry: &[volume_of("virtual"), volume_of("state")],
    use_caches: &[
        CacheUse {
            kind: StateAtQp,
            roles: &["state"],
            history: Some(HistoryWindow::Unbounded),
        },
        cache(MaterialAtQp, &["material"]),
    ],
    reduction: Reduction::ElementDofs,
};

pub(crate) static AVERAGE_VARIABLE: TermInfo = TermInfo {
    name: "de_average_variable",
    arg_types: &[arg("parameter", Parameter)],
    geometry: &[volume_of("parameter")],
    use_caches: &[cache(StateAtQp, &["parameter"]), cache(Volume, &["parameter"])],
    reduction: Reduction::Element,
};
